//! Per-frame scene tick
//!
//! Order within one tick: arena update, physics step, collision bridge,
//! out-of-bounds despawn.

use glam::{Vec2, Vec3};

use super::arena::{Hexagon, WallSegment};
use super::ball::{BallId, BallRegistry};
use super::physics::{PhysicsWorld, WallContact};
use crate::chords::{Chord, ChordTable};
use crate::consts::{MAX_FRAME_DT, OUT_OF_BOUNDS};
use crate::params::SimConfig;

/// A wall hit that should sound
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTrigger {
    pub ball: BallId,
    pub chord: Chord,
}

/// Everything a tick produced
#[derive(Debug, Default)]
pub struct TickReport {
    pub triggers: Vec<ChordTrigger>,
    pub despawned: Vec<BallId>,
}

/// Render-facing snapshot of a ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallView {
    pub id: BallId,
    pub position: Vec2,
    pub flash: f32,
}

/// True when any coordinate has left the ±100 cube
pub fn out_of_bounds(position: Vec3) -> bool {
    position.abs().max_element() > OUT_OF_BOUNDS
}

/// Arena, physics and balls, advanced together
pub struct Scene {
    arena: Hexagon,
    physics: PhysicsWorld,
    balls: BallRegistry,
    applied: SimConfig,
}

impl Scene {
    pub fn new(config: &SimConfig) -> Self {
        let arena = Hexagon::new(config.openness);
        let physics = PhysicsWorld::new(&arena, config);
        Self {
            arena,
            physics,
            balls: BallRegistry::new(),
            applied: *config,
        }
    }

    pub fn walls(&self) -> &[WallSegment] {
        self.arena.walls()
    }

    pub fn rotation_angle(&self) -> f64 {
        self.arena.rotation_angle()
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn balls(&self) -> &BallRegistry {
        &self.balls
    }

    /// Live balls with their current positions
    pub fn ball_views(&self) -> impl Iterator<Item = BallView> + '_ {
        self.balls.iter().filter_map(|ball| {
            Some(BallView {
                id: ball.id,
                position: self.physics.body_position(ball.body)?,
                flash: ball.flash,
            })
        })
    }

    pub fn ball_position(&self, id: BallId) -> Option<Vec2> {
        self.physics.body_position(self.balls.get(id)?.body)
    }

    /// Drop a ball carrying `chord` at the arena centre
    pub fn spawn(&mut self, chord: Chord, config: &SimConfig) -> BallId {
        self.apply(config);
        let id = self.balls.next_id();
        let body = self.physics.spawn_ball(id);
        self.balls.insert(id, chord, body);
        log::debug!("Spawned {id}");
        id
    }

    /// Spawn the chord bound to `key`, if any
    pub fn spawn_for_key(&mut self, table: &ChordTable, key: &str, config: &SimConfig) -> Option<BallId> {
        let chord = table.chord_for_key(key)?.clone();
        Some(self.spawn(chord, config))
    }

    /// Teleport a live ball
    pub fn place_ball(&mut self, id: BallId, position: Vec2, velocity: Vec2) {
        if let Some(ball) = self.balls.get(id) {
            self.physics.place_body(ball.body, position, velocity);
        }
    }

    /// Remove a ball and its body; unknown ids are a no-op
    pub fn despawn(&mut self, id: BallId) -> bool {
        match self.balls.remove(id) {
            Some(ball) => {
                self.physics.remove_body(ball.body);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, config: &SimConfig) {
        if self.applied == *config {
            return;
        }
        self.physics.set_gravity(config.gravity);
        self.physics.set_restitution(config.restitution);
        self.applied = *config;
    }

    /// Advance the scene by one frame
    pub fn tick(&mut self, config: &SimConfig, dt: f32) -> TickReport {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        let mut report = TickReport::default();
        self.apply(config);

        self.arena.update(config.rotation_speed, config.openness, dt);
        self.physics.sync_walls(&self.arena);

        if dt > 0.0 {
            for contact in self.physics.step(dt) {
                match contact {
                    WallContact::Started(id) => {
                        // Despawned or unknown balls are skipped
                        if let Some(ball) = self.balls.get(id) {
                            report.triggers.push(ChordTrigger {
                                ball: id,
                                chord: ball.chord().clone(),
                            });
                        }
                    }
                    WallContact::Stopped(id) => self.balls.flash(id),
                }
            }
        }
        self.balls.decay_flash(dt);

        let gone: Vec<BallId> = self
            .balls
            .iter()
            .filter(|ball| {
                self.physics
                    .body_position(ball.body)
                    .is_none_or(|p| out_of_bounds(p.extend(0.0)))
            })
            .map(|ball| ball.id)
            .collect();
        for id in gone {
            if self.despawn(id) {
                report.despawned.push(id);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn table() -> ChordTable {
        ChordTable::default()
    }

    #[test]
    fn test_out_of_bounds_any_axis() {
        assert!(!out_of_bounds(Vec3::new(100.0, -100.0, 0.0)));
        assert!(out_of_bounds(Vec3::new(100.5, 0.0, 0.0)));
        assert!(out_of_bounds(Vec3::new(0.0, -101.0, 0.0)));
        assert!(out_of_bounds(Vec3::new(0.0, 0.0, 250.0)));
    }

    #[test]
    fn test_key_spawns_one_ball_with_its_chord() {
        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        let id = scene.spawn_for_key(&table(), "a", &config).unwrap();
        assert_eq!(scene.ball_count(), 1);
        let ball = scene.balls().get(id).unwrap();
        assert_eq!(ball.chord(), table().chord_for_key("a").unwrap());
        assert_eq!(ball.chord().len(), 4);
        assert_eq!(scene.ball_position(id), Some(Vec2::ZERO));
    }

    #[test]
    fn test_unknown_key_spawns_nothing() {
        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        assert!(scene.spawn_for_key(&table(), "q", &config).is_none());
        assert!(scene.spawn_for_key(&table(), "Enter", &config).is_none());
        assert_eq!(scene.ball_count(), 0);
    }

    #[test]
    fn test_wall_hit_triggers_spawned_chord() {
        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        let id = scene.spawn_for_key(&table(), "z", &config).unwrap();
        let expected = table().chord_for_key("z").unwrap().clone();

        let mut triggers = Vec::new();
        for _ in 0..120 {
            triggers.extend(scene.tick(&config, DT).triggers);
        }
        assert!(!triggers.is_empty());
        for trigger in &triggers {
            assert_eq!(trigger.ball, id);
            assert_eq!(trigger.chord, expected);
        }
        assert_eq!(scene.ball_count(), 1);
    }

    #[test]
    fn test_each_ball_triggers_its_own_chord() {
        let config = SimConfig {
            gravity: 0.0,
            ..SimConfig::default()
        };
        let mut scene = Scene::new(&config);
        let left = scene.spawn_for_key(&table(), "z", &config).unwrap();
        let right = scene.spawn_for_key(&table(), "h", &config).unwrap();
        scene.place_ball(left, Vec2::new(-5.0, 0.0), Vec2::new(-20.0, 0.0));
        scene.place_ball(right, Vec2::new(5.0, 0.0), Vec2::new(20.0, 0.0));

        let mut triggers = Vec::new();
        for _ in 0..60 {
            triggers.extend(scene.tick(&config, DT).triggers);
        }

        let z = table().chord_for_key("z").unwrap().clone();
        let h = table().chord_for_key("h").unwrap().clone();
        assert_ne!(z, h);
        assert!(triggers.iter().any(|t| t.ball == left));
        assert!(triggers.iter().any(|t| t.ball == right));
        for trigger in &triggers {
            let expected = if trigger.ball == left { &z } else { &h };
            assert_eq!(&trigger.chord, expected, "{} played the wrong chord", trigger.ball);
        }
    }

    #[test]
    fn test_escaped_ball_removed_other_untouched() {
        let config = SimConfig {
            gravity: 0.0,
            ..SimConfig::default()
        };
        let mut scene = Scene::new(&config);
        let stays = scene.spawn_for_key(&table(), "a", &config).unwrap();
        let leaves = scene.spawn_for_key(&table(), "s", &config).unwrap();
        scene.place_ball(stays, Vec2::new(2.0, 0.0), Vec2::ZERO);
        scene.place_ball(leaves, Vec2::new(0.0, 150.0), Vec2::ZERO);

        let report = scene.tick(&config, DT);
        assert_eq!(report.despawned, vec![leaves]);
        assert_eq!(scene.ball_count(), 1);
        assert!(scene.balls().get(stays).is_some());
        assert!(scene.ball_position(leaves).is_none());

        for _ in 0..10 {
            let report = scene.tick(&config, DT);
            assert!(report.despawned.is_empty());
        }
        assert!(scene.balls().get(leaves).is_none());
        assert!(!scene.despawn(leaves));
    }

    #[test]
    fn test_open_hexagon_lets_balls_fall_out() {
        let config = SimConfig {
            openness: 2.0,
            rotation_speed: 0.0,
            ..SimConfig::default()
        };
        let mut scene = Scene::new(&config);
        let id = scene.spawn_for_key(&table(), "d", &config).unwrap();
        let mut despawned = Vec::new();
        for _ in 0..240 {
            despawned.extend(scene.tick(&config, DT).despawned);
        }
        assert_eq!(despawned, vec![id]);
        assert_eq!(scene.ball_count(), 0);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let config = SimConfig::default();
        let mut scene = Scene::new(&config);
        scene.tick(&config, 5.0);
        let expected = config.rotation_speed as f64 * MAX_FRAME_DT as f64;
        assert!((scene.rotation_angle() - expected).abs() < 1e-6);
    }
}
