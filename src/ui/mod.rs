//! Control surface
//!
//! Knob and fader value models are platform independent; `dom` wires them to
//! the page on wasm32.

pub mod fader;
pub mod knob;

#[cfg(target_arch = "wasm32")]
pub mod dom;

pub use fader::Fader;
pub use knob::{Knob, KnobKey};

use crate::params::{Controls, Param};

/// Fader track height (px)
pub const FADER_HEIGHT: f32 = 200.0;

/// A control's on-screen widget
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Knob(Knob),
    Fader(Fader),
}

impl Widget {
    pub fn value(&self) -> f32 {
        match self {
            Widget::Knob(knob) => knob.value(),
            Widget::Fader(fader) => fader.value(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Widget::Knob(knob) => knob.display(),
            Widget::Fader(fader) => fader.display(),
        }
    }
}

/// Ambient loop volumes use faders, physics controls use knobs
pub fn is_fader(param: Param) -> bool {
    matches!(param, Param::Rain | Param::VinylSim)
}

/// All widgets, in `Param::ALL` order
#[derive(Debug, Clone)]
pub struct ControlPanel {
    widgets: Vec<(Param, Widget)>,
    /// Control under the pointer and its fader track top
    drag: Option<(Param, f32)>,
}

impl ControlPanel {
    pub fn new(controls: &Controls) -> Self {
        let widgets = Param::ALL
            .into_iter()
            .map(|param| {
                let raw = controls.raw(param);
                let widget = if is_fader(param) {
                    Widget::Fader(Fader::new(0.0, 100.0, raw, FADER_HEIGHT))
                } else {
                    Widget::Knob(Knob::new(0.0, 100.0, raw))
                };
                (param, widget)
            })
            .collect();
        Self {
            widgets,
            drag: None,
        }
    }

    pub fn widget(&self, param: Param) -> Option<&Widget> {
        self.widgets.iter().find(|(p, _)| *p == param).map(|(_, w)| w)
    }

    pub fn widget_mut(&mut self, param: Param) -> Option<&mut Widget> {
        self.widgets
            .iter_mut()
            .find(|(p, _)| *p == param)
            .map(|(_, w)| w)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Param, Widget)> {
        self.widgets.iter()
    }

    /// Grab a control. Faders jump to the pointer; `track_top` is ignored for knobs.
    pub fn begin_drag(&mut self, param: Param, pointer_y: f32, track_top: f32) -> Option<f32> {
        self.end_drag();
        let changed = match self.widget_mut(param)? {
            Widget::Knob(knob) => {
                knob.begin_drag(pointer_y);
                false
            }
            Widget::Fader(fader) => {
                fader.begin_drag();
                fader.drag_to(pointer_y - track_top)
            }
        };
        self.drag = Some((param, track_top));
        self.changed(param, changed)
    }

    /// Follow the pointer; returns the dragged control's new value when it moved
    pub fn drag_to(&mut self, pointer_y: f32) -> Option<(Param, f32)> {
        let (param, track_top) = self.drag?;
        let changed = match self.widget_mut(param)? {
            Widget::Knob(knob) => knob.drag_to(pointer_y),
            Widget::Fader(fader) => fader.drag_to(pointer_y - track_top),
        };
        self.changed(param, changed).map(|value| (param, value))
    }

    pub fn end_drag(&mut self) {
        let Some((param, _)) = self.drag.take() else {
            return;
        };
        match self.widget_mut(param) {
            Some(Widget::Knob(knob)) => knob.end_drag(),
            Some(Widget::Fader(fader)) => fader.end_drag(),
            None => {}
        }
    }

    pub fn dragging(&self) -> Option<Param> {
        self.drag.map(|(param, _)| param)
    }

    /// Keyboard step on a knob
    pub fn key(&mut self, param: Param, key: KnobKey) -> Option<f32> {
        let changed = match self.widget_mut(param)? {
            Widget::Knob(knob) => knob.key(key),
            Widget::Fader(_) => false,
        };
        self.changed(param, changed)
    }

    fn changed(&self, param: Param, changed: bool) -> Option<f32> {
        changed
            .then(|| self.widget(param).map(Widget::value))
            .flatten()
    }
}
