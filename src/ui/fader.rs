//! Vertical fader value model

/// Handle height (px)
pub const HANDLE_HEIGHT: f32 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Fader {
    min: f32,
    max: f32,
    value: f32,
    /// Track height (px)
    height: f32,
    dragging: bool,
}

impl Fader {
    pub fn new(min: f32, max: f32, value: f32, height: f32) -> Self {
        Self {
            min,
            max,
            value: value.clamp(min, max),
            height,
            dragging: false,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set(&mut self, value: f32) -> bool {
        let value = value.clamp(self.min, self.max);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    fn travel(&self) -> f32 {
        (self.height - HANDLE_HEIGHT).max(1.0)
    }

    /// Handle top offset within the track; max value sits at the top
    pub fn handle_position(&self) -> f32 {
        if self.max <= self.min {
            return self.travel();
        }
        let percentage = (self.value - self.min) / (self.max - self.min);
        (1.0 - percentage) * self.travel()
    }

    fn position_to_value(&self, y: f32) -> f32 {
        let percentage = 1.0 - y / self.travel();
        self.min + (self.max - self.min) * percentage
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Pointer y relative to the track top
    pub fn drag_to(&mut self, relative_y: f32) -> bool {
        if !self.dragging {
            return false;
        }
        let y = relative_y.clamp(0.0, self.travel());
        self.set(self.position_to_value(y))
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    pub fn display(&self) -> String {
        format!("{}", self.value.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_position() {
        let mut fader = Fader::new(0.0, 100.0, 0.0, 200.0);
        assert_eq!(fader.handle_position(), 160.0);
        fader.set(100.0);
        assert_eq!(fader.handle_position(), 0.0);
        fader.set(50.0);
        assert_eq!(fader.handle_position(), 80.0);
    }

    #[test]
    fn test_drag_clamps_to_track() {
        let mut fader = Fader::new(0.0, 100.0, 0.0, 200.0);
        assert!(!fader.drag_to(0.0));
        fader.begin_drag();
        fader.drag_to(-50.0);
        assert_eq!(fader.value(), 100.0);
        fader.drag_to(500.0);
        assert_eq!(fader.value(), 0.0);
        fader.drag_to(40.0);
        assert_eq!(fader.value(), 75.0);
        assert_eq!(fader.display(), "75");
        fader.end_drag();
    }

    #[test]
    fn test_empty_range_sits_at_bottom() {
        let fader = Fader::new(5.0, 5.0, 5.0, 200.0);
        assert_eq!(fader.handle_position(), 200.0 - HANDLE_HEIGHT);
        assert!(fader.handle_position().is_finite());
    }
}
