//! WebGPU rendering module
//!
//! Two fullscreen passes per frame:
//! - `sketch`: generative background into an off-screen texture
//! - `scene_pipeline`: SDF walls and balls over the sampled sketch

pub mod scene_pipeline;
pub mod sketch;

pub use scene_pipeline::Renderer;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::consts::{HEX_RADIUS, PIXELS_PER_UNIT, WALL_THICKNESS};
use crate::sim::{BallView, WallSegment};

/// Maximum balls drawn per frame
pub const MAX_BALLS: usize = 256;

/// Renderer setup failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Pixels per world unit for a viewport, shrunk so the hexagon fits
pub fn camera_scale(width: u32, height: u32) -> f32 {
    // Leave room for the walls' outer corners
    let needed = HEX_RADIUS + WALL_THICKNESS * 2.0;
    let fit = width.min(height) as f32 / 2.0 / needed;
    PIXELS_PER_UNIT.min(fit).max(0.1)
}

// ============================================================================
// GPU DATA STRUCTURES (must match scene.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneGlobals {
    pub resolution: [f32; 2], // offset 0
    pub time: f32,            // offset 8
    pub scale: f32,           // offset 12
    pub wall_count: u32,      // offset 16
    pub ball_count: u32,      // offset 20
    pub wall_half: [f32; 2],  // offset 24
    pub ball_radius: f32,     // offset 32
    pub _pad: [u32; 3],       // pad to 48 bytes
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WallData {
    pub pos: [f32; 2],
    pub angle: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BallData {
    pub pos: [f32; 2],
    pub flash: f32,
    pub _pad: f32,
}

/// Pack wall transforms for the storage buffer
pub fn pack_walls(walls: &[WallSegment]) -> Vec<WallData> {
    walls
        .iter()
        .map(|wall| {
            let p = wall.transform.position_2d();
            WallData {
                pos: [p.x, p.y],
                angle: wall.transform.planar_angle(),
                _pad: 0.0,
            }
        })
        .collect()
}

/// Pack balls into a fixed-size buffer; returns the live count
pub fn pack_balls(balls: impl IntoIterator<Item = BallView>) -> (Vec<BallData>, u32) {
    let mut data = vec![BallData::default(); MAX_BALLS];
    let mut count = 0;
    for (slot, ball) in data.iter_mut().zip(balls) {
        *slot = BallData {
            pos: [ball.position.x, ball.position.y],
            flash: ball.flash,
            _pad: 0.0,
        };
        count += 1;
    }
    (data, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimConfig;
    use crate::sim::Hexagon;
    use glam::Vec2;

    #[test]
    fn test_globals_layout() {
        assert_eq!(std::mem::size_of::<SceneGlobals>(), 48);
        assert_eq!(std::mem::size_of::<WallData>(), 16);
        assert_eq!(std::mem::size_of::<BallData>(), 16);
    }

    #[test]
    fn test_camera_scale_fits_small_viewports() {
        assert_eq!(camera_scale(1920, 1080), PIXELS_PER_UNIT);
        let small = camera_scale(300, 600);
        assert!(small < PIXELS_PER_UNIT);
        assert!(small * (HEX_RADIUS + 2.0) <= 150.0 + 1e-3);
    }

    #[test]
    fn test_pack_walls_matches_arena() {
        let hex = Hexagon::new(SimConfig::default().openness);
        let packed = pack_walls(hex.walls());
        assert_eq!(packed.len(), 6);
        let p = hex.walls()[2].transform.position_2d();
        assert_eq!(packed[2].pos, [p.x, p.y]);
    }

    #[test]
    fn test_pack_balls_caps_count() {
        let mut registry = crate::sim::BallRegistry::new();
        let views: Vec<BallView> = (0..MAX_BALLS + 10)
            .map(|i| BallView {
                id: registry.next_id(),
                position: Vec2::new(i as f32, 0.0),
                flash: 0.5,
            })
            .collect();
        let (data, count) = pack_balls(views);
        assert_eq!(data.len(), MAX_BALLS);
        assert_eq!(count as usize, MAX_BALLS);
        assert_eq!(data[3].pos, [3.0, 0.0]);

        let (_, none) = pack_balls(std::iter::empty::<BallView>());
        assert_eq!(none, 0);
    }
}
