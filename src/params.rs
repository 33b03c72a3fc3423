//! Knob percentages mapped into simulation and audio parameters
//!
//! Every control stores a raw percentage in [0, 100]. The simulation never
//! sees raw values: `Controls::sim_config` maps them into domain units once
//! per change and the result is passed by reference into `sim::tick`.

/// Linear interpolation of a percentage into [start, end]
#[inline]
pub fn lerp(start: f32, end: f32, percent: f32) -> f32 {
    start + (end - start) * (percent / 100.0)
}

/// Domain range a percentage maps into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Map a raw percentage into this range
    #[inline]
    pub fn map(&self, raw: f32) -> f32 {
        lerp(self.min, self.max, raw)
    }
}

/// User-facing controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// Openness of the hexagon ("Shape" knob)
    Shape,
    Gravity,
    Bounce,
    Rotation,
    /// Rain loop volume (dB)
    Rain,
    /// Vinyl crackle loop volume (dB)
    VinylSim,
}

impl Param {
    pub const ALL: [Param; 6] = [
        Param::Shape,
        Param::Gravity,
        Param::Bounce,
        Param::Rotation,
        Param::Rain,
        Param::VinylSim,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Param::Shape => "Shape",
            Param::Gravity => "Gravity",
            Param::Bounce => "Bounce",
            Param::Rotation => "Rotation",
            Param::Rain => "Rain Volume",
            Param::VinylSim => "Vinyl Sim Volume",
        }
    }

    /// DOM id suffix
    pub fn key(&self) -> &'static str {
        match self {
            Param::Shape => "shape",
            Param::Gravity => "gravity",
            Param::Bounce => "bounce",
            Param::Rotation => "rotation",
            Param::Rain => "rain",
            Param::VinylSim => "vinyl-sim",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Domain range for this control
    pub fn range(&self) -> ParamRange {
        match self {
            Param::Shape => ParamRange::new(1.0, 2.0),
            Param::Gravity => ParamRange::new(0.0, 98.0),
            Param::Bounce => ParamRange::new(0.0, 1.0),
            Param::Rotation => ParamRange::new(0.0, 1.5),
            Param::Rain | Param::VinylSim => ParamRange::new(0.0, 25.0),
        }
    }

    /// Raw percentage on page load
    pub fn default_raw(&self) -> f32 {
        match self {
            Param::Shape => 0.0,
            Param::Gravity => 100.0,
            Param::Bounce => 100.0,
            Param::Rotation => 30.0,
            Param::Rain | Param::VinylSim => 0.0,
        }
    }
}

/// Simulation parameters in domain units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Restitution applied to walls and balls
    pub restitution: f32,
    /// Hexagon angular speed (rad/s)
    pub rotation_speed: f32,
    /// Per-wall opening factor in [1, 2]
    pub openness: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Controls::default().sim_config()
    }
}

/// Raw control values (percentages)
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    shape: f32,
    gravity: f32,
    bounce: f32,
    rotation: f32,
    rain: f32,
    vinyl_sim: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            shape: Param::Shape.default_raw(),
            gravity: Param::Gravity.default_raw(),
            bounce: Param::Bounce.default_raw(),
            rotation: Param::Rotation.default_raw(),
            rain: Param::Rain.default_raw(),
            vinyl_sim: Param::VinylSim.default_raw(),
        }
    }
}

impl Controls {
    fn slot(&mut self, param: Param) -> &mut f32 {
        match param {
            Param::Shape => &mut self.shape,
            Param::Gravity => &mut self.gravity,
            Param::Bounce => &mut self.bounce,
            Param::Rotation => &mut self.rotation,
            Param::Rain => &mut self.rain,
            Param::VinylSim => &mut self.vinyl_sim,
        }
    }

    /// Raw percentage of a control
    pub fn raw(&self, param: Param) -> f32 {
        match param {
            Param::Shape => self.shape,
            Param::Gravity => self.gravity,
            Param::Bounce => self.bounce,
            Param::Rotation => self.rotation,
            Param::Rain => self.rain,
            Param::VinylSim => self.vinyl_sim,
        }
    }

    /// Set a raw percentage (clamped to [0, 100]); returns the stored value
    pub fn set_raw(&mut self, param: Param, raw: f32) -> f32 {
        let raw = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };
        *self.slot(param) = raw;
        raw
    }

    /// Domain value of a control
    pub fn value(&self, param: Param) -> f32 {
        param.range().map(self.raw(param))
    }

    /// Snapshot of the physics-facing parameters
    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            gravity: self.value(Param::Gravity),
            restitution: self.value(Param::Bounce),
            rotation_speed: self.value(Param::Rotation),
            openness: self.value(Param::Shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_gravity_examples() {
        let range = Param::Gravity.range();
        assert_eq!(range.map(0.0), 0.0);
        assert_eq!(range.map(100.0), 98.0);
        assert!((range.map(50.0) - 49.0).abs() < 1e-5);
    }

    #[test]
    fn test_openness_range() {
        let range = Param::Shape.range();
        assert_eq!(range.map(0.0), 1.0);
        assert_eq!(range.map(100.0), 2.0);
    }

    #[test]
    fn test_default_sim_config() {
        let config = SimConfig::default();
        assert_eq!(config.gravity, 98.0);
        assert_eq!(config.restitution, 1.0);
        assert!((config.rotation_speed - 0.45).abs() < 1e-5);
        assert_eq!(config.openness, 1.0);
    }

    #[test]
    fn test_set_raw_clamps() {
        let mut controls = Controls::default();
        assert_eq!(controls.set_raw(Param::Gravity, 150.0), 100.0);
        assert_eq!(controls.set_raw(Param::Gravity, -3.0), 0.0);
        assert_eq!(controls.set_raw(Param::Gravity, f32::NAN), 0.0);
        assert_eq!(controls.sim_config().gravity, 0.0);
    }

    #[test]
    fn test_param_keys_round_trip() {
        for param in Param::ALL {
            assert_eq!(Param::from_key(param.key()), Some(param));
        }
        assert_eq!(Param::from_key("volume"), None);
    }
}
