//! HexSeq entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use hexseq::audio::AudioManager;
    use hexseq::chords::ChordTable;
    use hexseq::params::{Controls, Param};
    use hexseq::renderer::{RenderError, Renderer};
    use hexseq::settings::Settings;
    use hexseq::sim::Scene;
    use hexseq::synth::Instrument;
    use hexseq::ui::dom;
    use hexseq::ui::{ControlPanel, KnobKey, is_fader};

    /// Haptic tick for on-screen chord keys (ms)
    const KEY_VIBRATE_MS: u32 = 20;

    /// App instance holding all state
    struct Game {
        scene: Scene,
        controls: Controls,
        table: ChordTable,
        audio: AudioManager,
        renderer: Option<Renderer>,
        panel: ControlPanel,
        settings: Settings,
        last_time: f64,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let controls = Controls::default();
            Self {
                scene: Scene::new(&controls.sim_config()),
                panel: ControlPanel::new(&controls),
                controls,
                table: ChordTable::default(),
                audio: AudioManager::new(seed),
                renderer: None,
                settings: Settings::load(),
                last_time: 0.0,
            }
        }

        /// Spawn the chord bound to `key`, if any
        fn press_key(&mut self, key: &str) -> bool {
            let config = self.controls.sim_config();
            match self.scene.spawn_for_key(&self.table, key, &config) {
                Some(id) => {
                    log::debug!("Key {key:?} spawned {id}");
                    true
                }
                None => false,
            }
        }

        /// Store a control value coming from its widget
        fn apply_control(&mut self, param: Param, raw: f32) {
            self.controls.set_raw(param, raw);
            if is_fader(param) {
                let volume_db = self.controls.value(param);
                self.audio.set_loop_volume(param, volume_db);
            }
        }

        fn select_instrument(&mut self, instrument: Instrument) {
            self.audio.set_instrument(instrument);
            if let Some(document) = dom::document() {
                dom::show_instrument(&document, instrument.label());
            }
        }

        /// Advance the scene and voice the wall hits
        fn update(&mut self, dt: f32) {
            let config = self.controls.sim_config();
            let report = self.scene.tick(&config, dt);
            for trigger in &report.triggers {
                self.audio.play(trigger);
            }
            for id in &report.despawned {
                log::debug!("{id} left the arena");
            }
        }

        /// Render the current frame
        fn render(&mut self, time: f64) {
            if let Some(ref mut renderer) = self.renderer {
                match renderer.render(&self.scene, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let (w, h) = renderer.size;
                        renderer.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        fn set_help_visible(&mut self, visible: bool) {
            if !visible {
                // Dismissal counts as the unlocking gesture
                self.audio.resume();
            }
            if let Some(document) = dom::document() {
                dom::set_hidden(&document, "help", !visible);
            }
            if self.settings.show_help != visible {
                self.settings.show_help = visible;
                self.settings.save();
            }
        }
    }

    /// Canvas backing size in device pixels
    fn canvas_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        (width.max(1), height.max(1))
    }

    async fn init_renderer(canvas: &HtmlCanvasElement, width: u32, height: u32) -> Result<Renderer, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let mut renderer = Renderer::new(surface, &adapter, width, height).await?;
        renderer.set_start_time(js_sys::Date::now());
        Ok(renderer)
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Logger unavailable: {e}").into());
        }

        log::info!("HexSeq starting...");

        let Some(document) = dom::document() else {
            log::error!("No document");
            return;
        };

        // Hide loading indicator
        dom::set_hidden(&document, "loading", true);

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));
        log::info!("Audio seeded with {}", seed);

        {
            let g = game.borrow();
            dom::render_panel(&document, &g.panel);
            dom::show_instrument(&document, g.audio.instrument().label());
            dom::set_hidden(&document, "help", !g.settings.show_help);
        }

        // Sim and audio keep running without a canvas or GPU
        let canvas = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok());
        match &canvas {
            Some(canvas) => {
                let (width, height) = canvas_size(canvas);
                canvas.set_width(width);
                canvas.set_height(height);
                match init_renderer(canvas, width, height).await {
                    Ok(renderer) => game.borrow_mut().renderer = Some(renderer),
                    Err(e) => log::error!("Visuals disabled: {e}"),
                }
                setup_resize(canvas.clone(), game.clone());
            }
            None => log::error!("No #canvas element, visuals disabled"),
        }

        setup_keyboard(game.clone());
        setup_controls(&document, game.clone());
        setup_drawer(&document);
        setup_help(&document, game.clone());
        setup_chord_keys(&document, game.clone());

        request_animation_frame(game);

        log::info!("HexSeq running!");
    }

    fn on_click(element: &Element, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
        let closure = Closure::<dyn FnMut(_)>::new(handler);
        let _ = element.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if event.ctrl_key() || event.meta_key() || event.alt_key() {
                return;
            }
            let mut g = game.borrow_mut();
            // First gesture unlocks audio
            g.audio.resume();

            let key = event.key();
            if let Some(instrument) = Instrument::from_key(&key) {
                g.select_instrument(instrument);
                return;
            }
            // Held keys keep spawning on auto-repeat
            g.press_key(&key);
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Pointer drag and keyboard stepping for every knob and fader
    fn setup_controls(document: &Document, game: Rc<RefCell<Game>>) {
        for param in Param::ALL {
            let Some(element) = document.get_element_by_id(&dom::widget_id(param)) else {
                log::warn!("Missing control for {}", param.label());
                continue;
            };

            {
                let game = game.clone();
                let target = element.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                    event.prevent_default();
                    let track_top = target
                        .query_selector(".fader-track")
                        .ok()
                        .flatten()
                        .map_or(0.0, |track| track.get_bounding_client_rect().top() as f32);
                    let mut g = game.borrow_mut();
                    g.audio.resume();
                    if let Some(value) = g.panel.begin_drag(param, event.client_y() as f32, track_top) {
                        g.apply_control(param, value);
                    }
                    if let (Some(document), Some(widget)) = (dom::document(), g.panel.widget(param)) {
                        dom::render_widget(&document, param, widget);
                    }
                });
                let _ = element
                    .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
                closure.forget();
            }

            // Knob keys stay on the knob, not the chord keys
            if !is_fader(param) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                    let Some(key) = KnobKey::from_dom_key(&event.key()) else {
                        return;
                    };
                    event.prevent_default();
                    event.stop_propagation();
                    let mut g = game.borrow_mut();
                    if let Some(value) = g.panel.key(param, key) {
                        g.apply_control(param, value);
                        if let (Some(document), Some(widget)) = (dom::document(), g.panel.widget(param)) {
                            dom::render_widget(&document, param, widget);
                        }
                    }
                });
                let _ = element.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }

        let Some(window) = web_sys::window() else { return };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                if let Some((param, value)) = g.panel.drag_to(event.client_y() as f32) {
                    g.apply_control(param, value);
                    if let (Some(document), Some(widget)) = (dom::document(), g.panel.widget(param)) {
                        dom::render_widget(&document, param, widget);
                    }
                }
            });
            let _ = window.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                game.borrow_mut().panel.end_drag();
            });
            for name in ["pointerup", "pointercancel"] {
                let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }
    }

    /// Side drawer for narrow viewports
    fn setup_drawer(document: &Document) {
        if let Some(toggle) = document.get_element_by_id("menu-toggle") {
            on_click(&toggle, move |_| {
                let Some(document) = dom::document() else { return };
                let open = document
                    .get_element_by_id("drawer")
                    .is_some_and(|d| d.class_list().contains("open"));
                dom::set_open(&document, "drawer", !open);
                dom::set_hidden(&document, "drawer-backdrop", open);
            });
        }
        if let Some(backdrop) = document.get_element_by_id("drawer-backdrop") {
            on_click(&backdrop, move |_| {
                let Some(document) = dom::document() else { return };
                dom::set_open(&document, "drawer", false);
                dom::set_hidden(&document, "drawer-backdrop", true);
            });
        }
    }

    fn setup_help(document: &Document, game: Rc<RefCell<Game>>) {
        if let Some(button) = document.get_element_by_id("help-dismiss") {
            let game = game.clone();
            on_click(&button, move |_| game.borrow_mut().set_help_visible(false));
        }
        if let Some(overlay) = document.get_element_by_id("help") {
            let game = game.clone();
            let target = overlay.clone();
            // Only clicks on the backdrop itself, not the dialog
            on_click(&overlay, move |event| {
                let on_backdrop = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                    .is_some_and(|el| el == target);
                if on_backdrop {
                    game.borrow_mut().set_help_visible(false);
                }
            });
        }
        if let Some(button) = document.get_element_by_id("help-button") {
            on_click(&button, move |_| game.borrow_mut().set_help_visible(true));
        }
    }

    fn setup_chord_keys(document: &Document, game: Rc<RefCell<Game>>) {
        let buttons = {
            let g = game.borrow();
            dom::build_chord_keys(document, &g.table)
        };
        for (key, button) in buttons {
            let game = game.clone();
            let key = key.to_string();
            on_click(&button, move |_| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                if g.press_key(&key) {
                    dom::vibrate(KEY_VIBRATE_MS);
                }
            });
        }
    }

    fn setup_resize(canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (width, height) = canvas_size(&canvas);
            canvas.set_width(width);
            canvas.set_height(height);
            if let Some(renderer) = game.borrow_mut().renderer.as_mut() {
                renderer.resize(width, height);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            g.last_time = time;

            g.update(dt);
            g.render(time);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("HexSeq (native) starting...");
    log::info!("Native mode runs a headless demo - run with `trunk serve` for the web version");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drop a few chords into the arena and log what they play
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use hexseq::chords::ChordTable;
    use hexseq::params::{Controls, Param};
    use hexseq::sim::Scene;
    use hexseq::synth::VoicePool;

    const FRAME_DT: f32 = 1.0 / 60.0;
    const FRAMES: usize = 60 * 20;

    let mut controls = Controls::default();
    let table = ChordTable::default();
    let mut scene = Scene::new(&controls.sim_config());
    let mut voices = VoicePool::default();
    let lifetime = hexseq::synth::Instrument::default()
        .preset()
        .envelope
        .voice_lifetime(hexseq::consts::NOTE_DURATION_SECS);

    let (mut played, mut dropped) = (0usize, 0usize);
    for frame in 0..FRAMES {
        // One key per second; open the hexagon for the last quarter
        if frame % 60 == 0 {
            let key = ["a", "z", "f", "c", "h"][(frame / 60) % 5];
            scene.spawn_for_key(&table, key, &controls.sim_config());
        }
        if frame == FRAMES * 3 / 4 {
            controls.set_raw(Param::Shape, 100.0);
            log::info!("Opening the hexagon");
        }

        let report = scene.tick(&controls.sim_config(), FRAME_DT);
        let now = frame as f64 * FRAME_DT as f64;
        for trigger in &report.triggers {
            let granted = voices.admit(now, trigger.chord.len(), lifetime);
            if granted == 0 {
                dropped += 1;
                continue;
            }
            played += 1;
            log::info!("{:>6.2}s {} plays {}", now, trigger.ball, trigger.chord);
        }
        for id in &report.despawned {
            log::info!("{:>6.2}s {} escaped", now, id);
        }
    }

    log::info!(
        "Done: {} chords played, {} dropped, {} balls left",
        played,
        dropped,
        scene.ball_count()
    );
}
