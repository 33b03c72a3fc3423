//! HexSeq - a rotating hexagon physics sequencer
//!
//! Core modules:
//! - `sim`: Arena rotation, ball lifecycle, physics world and the per-frame tick
//! - `params`: Knob percentages mapped into simulation parameters
//! - `chords`: Notes, chords and the keyboard chord table
//! - `synth`: Instrument presets, envelopes and polyphony (platform independent)
//! - `audio`: Web Audio playback (wasm only)
//! - `renderer`: WebGPU background sketch and scene pipeline
//! - `ui`: Knob/fader models and DOM wiring

pub mod chords;
pub mod params;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod synth;
pub mod ui;

#[cfg(target_arch = "wasm32")]
pub mod audio;

pub use chords::{Chord, ChordTable, Note};
pub use params::{Controls, Param, SimConfig};
pub use settings::Settings;

/// Configuration constants
pub mod consts {
    /// Largest frame delta fed to the physics step (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// CCD substeps for fast, small balls
    pub const MAX_CCD_SUBSTEPS: usize = 10;

    /// Hexagon geometry (world units)
    pub const HEX_SIDES: usize = 6;
    pub const HEX_RADIUS: f32 = 18.0;
    pub const WALL_THICKNESS: f32 = 1.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.7;
    /// Any coordinate beyond this removes the ball
    pub const OUT_OF_BOUNDS: f32 = 100.0;
    /// Seconds a ball glows after leaving a wall
    pub const BALL_FLASH_SECS: f32 = 1.0;

    /// Voice cap shared by every instrument
    pub const MAX_POLYPHONY: usize = 24;
    /// Eighth note at 120 BPM
    pub const NOTE_DURATION_SECS: f64 = 0.25;

    /// Camera scale (pixels per world unit)
    pub const PIXELS_PER_UNIT: f32 = 10.0;
}

/// Wrap an angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(1.5 * PI) - (-PI / 2.0)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) - (-PI / 2.0)).abs() < 1e-6);
        assert!((normalize_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-5);
    }
}
