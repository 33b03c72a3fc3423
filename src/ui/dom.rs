//! DOM helpers for the control drawer, help overlay and chord keys

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

use super::{ControlPanel, Widget};
use crate::chords::ChordTable;
use crate::params::Param;

pub fn document() -> Option<Document> {
    web_sys::window()?.document()
}

/// Toggle the `hidden` class on an element by id
pub fn set_hidden(document: &Document, id: &str, hidden: bool) {
    if let Some(el) = document.get_element_by_id(id) {
        let _ = el.class_list().toggle_with_force("hidden", hidden);
    }
}

/// Toggle the `open` class on an element by id
pub fn set_open(document: &Document, id: &str, open: bool) {
    if let Some(el) = document.get_element_by_id(id) {
        let _ = el.class_list().toggle_with_force("open", open);
    }
}

/// DOM id of a control's container
pub fn widget_id(param: Param) -> String {
    let kind = if super::is_fader(param) { "fader" } else { "knob" };
    format!("{kind}-{}", param.key())
}

fn child(document: &Document, param: Param, class: &str) -> Option<HtmlElement> {
    document
        .query_selector(&format!("#{} .{class}", widget_id(param)))
        .ok()
        .flatten()?
        .dyn_into::<HtmlElement>()
        .ok()
}

/// Push one widget's state into the page
pub fn render_widget(document: &Document, param: Param, widget: &Widget) {
    match widget {
        Widget::Knob(knob) => {
            if let Some(thumb) = child(document, param, "knob-thumb") {
                let _ = thumb
                    .style()
                    .set_property("transform", &format!("rotate({}deg)", knob.angle()));
            }
            if let Some(el) = child(document, param, "knob-value") {
                el.set_text_content(Some(&knob.display()));
            }
            if let Some(el) = document.get_element_by_id(&widget_id(param)) {
                let _ = el.set_attribute("aria-valuenow", &knob.value().round().to_string());
            }
        }
        Widget::Fader(fader) => {
            if let Some(handle) = child(document, param, "fader-handle") {
                let _ = handle
                    .style()
                    .set_property("top", &format!("{}px", fader.handle_position()));
            }
            if let Some(el) = child(document, param, "fader-value") {
                el.set_text_content(Some(&fader.display()));
            }
        }
    }
}

pub fn render_panel(document: &Document, panel: &ControlPanel) {
    for (param, widget) in panel.iter() {
        render_widget(document, *param, widget);
    }
}

/// One button per chord table entry inside `#keys`
pub fn build_chord_keys(document: &Document, table: &ChordTable) -> Vec<(char, Element)> {
    let Some(container) = document.get_element_by_id("keys") else {
        return Vec::new();
    };
    table
        .entries()
        .take(12)
        .filter_map(|(key, chord)| {
            let button = document.create_element("button").ok()?;
            button.set_class_name("chord-key");
            button.set_text_content(Some(&key.to_uppercase().to_string()));
            let _ = button.set_attribute("title", &chord.to_string());
            let _ = button.set_attribute("data-key", &key.to_string());
            container.append_child(&button).ok()?;
            Some((key, button))
        })
        .collect()
}

/// Short haptic tick where supported
pub fn vibrate(ms: u32) {
    if let Some(window) = web_sys::window() {
        let _ = window.navigator().vibrate_with_duration(ms);
    }
}

/// Show the selected instrument's name
pub fn show_instrument(document: &Document, label: &str) {
    if let Some(el) = document.get_element_by_id("instrument") {
        el.set_text_content(Some(label));
    }
}
