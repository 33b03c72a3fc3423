//! Simulation module
//!
//! Arena rotation, ball lifecycle and the collision-to-chord bridge.
//! No rendering, audio or platform dependencies:
//! - Variable timestep, clamped per frame
//! - Parameters passed explicitly as `SimConfig`
//! - Balls carry typed chords, never untyped payloads

pub mod arena;
pub mod ball;
pub mod physics;
pub mod tick;

pub use arena::{Hexagon, WallSegment, WallTransform, radius_to_side, WALL_SPACING};
pub use ball::{Ball, BallId, BallRegistry};
pub use physics::{PhysicsWorld, WallContact};
pub use tick::{BallView, ChordTrigger, Scene, TickReport, out_of_bounds};
