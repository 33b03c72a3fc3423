//! Rotary knob value model

/// Thumb sweep (degrees)
pub const ANGLE_MIN: f32 = -145.0;
pub const ANGLE_MAX: f32 = 145.0;

/// Fraction of the range per dragged pixel
pub const DRAG_SENSITIVITY: f32 = 0.006;

pub const STEP: f32 = 1.0;
pub const STEP_LARGER: f32 = 10.0;

/// Keys a focused knob responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnobKey {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

impl KnobKey {
    /// Map a DOM `KeyboardEvent.key`
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "ArrowRight" => Some(KnobKey::Up),
            "ArrowDown" | "ArrowLeft" => Some(KnobKey::Down),
            "PageUp" => Some(KnobKey::PageUp),
            "PageDown" => Some(KnobKey::PageDown),
            "Home" => Some(KnobKey::Home),
            "End" => Some(KnobKey::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Knob {
    min: f32,
    max: f32,
    value: f32,
    /// Value and pointer y when the drag began
    drag_origin: Option<(f32, f32)>,
}

impl Knob {
    pub fn new(min: f32, max: f32, value: f32) -> Self {
        Self {
            min,
            max,
            value: value.clamp(min, max),
            drag_origin: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamp and store; returns true when the value changed
    pub fn set(&mut self, value: f32) -> bool {
        let value = value.clamp(self.min, self.max);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    /// Position in [0, 1]
    pub fn value01(&self) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        (self.value - self.min) / (self.max - self.min)
    }

    /// Thumb rotation in degrees
    pub fn angle(&self) -> f32 {
        ANGLE_MIN + (ANGLE_MAX - ANGLE_MIN) * self.value01()
    }

    /// Text under the knob
    pub fn display(&self) -> String {
        format!("{}%", self.value.round())
    }

    pub fn begin_drag(&mut self, pointer_y: f32) {
        self.drag_origin = Some((self.value, pointer_y));
    }

    /// Dragging up increases the value
    pub fn drag_to(&mut self, pointer_y: f32) -> bool {
        let Some((start_value, start_y)) = self.drag_origin else {
            return false;
        };
        let delta = (start_y - pointer_y) * DRAG_SENSITIVITY * (self.max - self.min);
        self.set(start_value + delta)
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    pub fn key(&mut self, key: KnobKey) -> bool {
        let target = match key {
            KnobKey::Up => self.value + STEP,
            KnobKey::Down => self.value - STEP,
            KnobKey::PageUp => self.value + STEP_LARGER,
            KnobKey::PageDown => self.value - STEP_LARGER,
            KnobKey::Home => self.min,
            KnobKey::End => self.max,
        };
        self.set(target)
    }
}
