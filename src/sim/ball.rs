//! Ball lifecycle bookkeeping
//!
//! The registry only knows id, chord, physics handle and the visual flash.
//! Positions live in the physics world.

use std::fmt;

use rapier2d::prelude::RigidBodyHandle;

use crate::chords::Chord;
use crate::consts::BALL_FLASH_SECS;

/// Monotonic ball id; 0 is never issued so untagged bodies read as "no ball"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(u64);

impl BallId {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Pack into a rapier `user_data` slot
    pub fn to_user_data(self) -> u128 {
        self.0 as u128
    }

    /// Unpack from a rapier `user_data` slot
    pub fn from_user_data(data: u128) -> Option<Self> {
        match u64::try_from(data) {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(Self(id)),
        }
    }
}

impl fmt::Display for BallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ball#{}", self.0)
    }
}

/// A live ball
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: BallId,
    chord: Chord,
    pub body: RigidBodyHandle,
    /// Glow intensity in [0, 1]
    pub flash: f32,
}

impl Ball {
    pub fn chord(&self) -> &Chord {
        &self.chord
    }
}

/// Dense array of live balls
#[derive(Debug, Default)]
pub struct BallRegistry {
    balls: Vec<Ball>,
    last_id: u64,
}

impl BallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id
    pub fn next_id(&mut self) -> BallId {
        self.last_id += 1;
        BallId(self.last_id)
    }

    pub fn insert(&mut self, id: BallId, chord: Chord, body: RigidBodyHandle) {
        debug_assert!(self.get(id).is_none(), "duplicate {id}");
        self.balls.push(Ball {
            id,
            chord,
            body,
            flash: 0.0,
        });
    }

    pub fn get(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    /// Remove a ball; unknown ids are a no-op
    pub fn remove(&mut self, id: BallId) -> Option<Ball> {
        let index = self.balls.iter().position(|b| b.id == id)?;
        Some(self.balls.swap_remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Light up a ball that just left a wall
    pub fn flash(&mut self, id: BallId) {
        if let Some(ball) = self.get_mut(id) {
            ball.flash = 1.0;
        }
    }

    /// Fade every flash toward zero
    pub fn decay_flash(&mut self, dt: f32) {
        let step = dt / BALL_FLASH_SECS;
        for ball in &mut self.balls {
            ball.flash = (ball.flash - step).max(0.0);
        }
    }
}
