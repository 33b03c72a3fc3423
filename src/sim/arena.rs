//! Rotating hexagon arena
//!
//! Six wall segments around the origin. Each tick the whole hexagon rotates
//! by `rotation_speed * dt`; each wall additionally turns about its own
//! centre by an openness offset, which swings the walls from a closed ring
//! (openness 1) to radial spokes (openness 2).

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Quat, Vec2, Vec3};

use crate::consts::{HEX_RADIUS, HEX_SIDES, WALL_THICKNESS};
use crate::normalize_angle;

/// Distance from the arena centre to the middle of each wall
pub fn radius_to_side() -> f32 {
    HEX_RADIUS * (PI / 6.0).cos() - WALL_THICKNESS / 2.0
}

/// Angular spacing between neighbouring walls
pub const WALL_SPACING: f32 = TAU / HEX_SIDES as f32;

/// Pose of a single wall, shared by the collider and the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl WallTransform {
    /// Position in the physics plane
    #[inline]
    pub fn position_2d(&self) -> Vec2 {
        self.position.truncate()
    }

    /// Rotation about +Z in [-π, π)
    pub fn planar_angle(&self) -> f32 {
        normalize_angle(2.0 * self.rotation.z.atan2(self.rotation.w))
    }
}

/// A wall and its fixed slot in the ring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSegment {
    pub index: usize,
    pub base_angle: f32,
    pub transform: WallTransform,
}

/// The rotating hexagon
#[derive(Debug, Clone)]
pub struct Hexagon {
    /// Accumulated rotation (radians); f64 so long sessions do not drift
    rotation_angle: f64,
    walls: [WallSegment; HEX_SIDES],
}

impl Default for Hexagon {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Hexagon {
    pub fn new(openness: f32) -> Self {
        let mut hexagon = Self {
            rotation_angle: 0.0,
            walls: std::array::from_fn(|index| WallSegment {
                index,
                base_angle: index as f32 * WALL_SPACING,
                transform: WallTransform {
                    position: Vec3::ZERO,
                    rotation: Quat::IDENTITY,
                },
            }),
        };
        hexagon.layout(openness);
        hexagon
    }

    pub fn rotation_angle(&self) -> f64 {
        self.rotation_angle
    }

    pub fn walls(&self) -> &[WallSegment; HEX_SIDES] {
        &self.walls
    }

    /// Advance the rotation and recompute every wall transform
    pub fn update(&mut self, rotation_speed: f32, openness: f32, dt: f32) {
        self.rotation_angle += rotation_speed as f64 * dt as f64;
        self.layout(openness);
    }

    fn layout(&mut self, openness: f32) {
        let whole = Quat::from_axis_angle(Vec3::Z, self.rotation_angle.rem_euclid(TAU as f64) as f32);
        let distance = radius_to_side();
        // openness is clamped upstream to [1, 2]; guard the division anyway
        let offset = PI / openness.max(f32::EPSILON);

        for wall in &mut self.walls {
            let base = wall.base_angle;
            let local = Vec3::new(distance * base.cos(), distance * base.sin(), 0.0);
            wall.transform = WallTransform {
                position: whole * local,
                rotation: Quat::from_axis_angle(Vec3::Z, offset + base + FRAC_PI_2) * whole,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_between(a: f32, b: f32) -> f32 {
        normalize_angle(b - a)
    }

    #[test]
    fn test_radius_to_side() {
        assert!((radius_to_side() - 15.088457).abs() < 1e-4);
    }

    #[test]
    fn test_walls_evenly_spaced() {
        for openness in [1.0, 1.5, 2.0] {
            let mut hex = Hexagon::new(openness);
            for _ in 0..10 {
                hex.update(0.37, openness, 0.25);
                let walls = hex.walls();
                for i in 0..HEX_SIDES {
                    let a = walls[i].transform;
                    let b = walls[(i + 1) % HEX_SIDES].transform;
                    let pos_step = angle_between(
                        a.position.y.atan2(a.position.x),
                        b.position.y.atan2(b.position.x),
                    );
                    let rot_step = angle_between(a.planar_angle(), b.planar_angle());
                    assert!((pos_step - WALL_SPACING).abs() < 1e-4, "pos step {pos_step}");
                    assert!((rot_step - WALL_SPACING).abs() < 1e-4, "rot step {rot_step}");
                }
            }
        }
    }

    #[test]
    fn test_zero_speed_keeps_transforms() {
        let mut hex = Hexagon::new(1.3);
        hex.update(0.0, 1.3, 1.0 / 60.0);
        let before = *hex.walls();
        for _ in 0..120 {
            hex.update(0.0, 1.3, 1.0 / 60.0);
        }
        assert_eq!(&before, hex.walls());
    }

    #[test]
    fn test_rotation_accumulates() {
        let mut hex = Hexagon::default();
        hex.update(1.5, 1.0, 0.5);
        hex.update(1.5, 1.0, 0.5);
        assert!((hex.rotation_angle() - 1.5).abs() < 1e-9);
        let first = hex.walls()[0].transform.position;
        let expected = Vec2::new(1.5f32.cos(), 1.5f32.sin()) * radius_to_side();
        assert!((first.truncate() - expected).length() < 1e-4);
        assert_eq!(first.z, 0.0);
    }

    #[test]
    fn test_openness_offsets() {
        // Closed ring: walls tangent to the circle (perpendicular to their radius)
        let closed = Hexagon::new(1.0);
        let wall = closed.walls()[0].transform;
        let tangent = Vec2::from_angle(wall.planar_angle());
        assert!(tangent.dot(wall.position_2d().normalize()).abs() < 1e-4);

        // Fully open: walls point along their radius
        let open = Hexagon::new(2.0);
        let wall = open.walls()[0].transform;
        let along = Vec2::from_angle(wall.planar_angle());
        assert!((along.dot(wall.position_2d().normalize()).abs() - 1.0).abs() < 1e-4);
    }
}
