//! Audio engine using Web Audio API
//!
//! Plays chord triggers through the selected instrument preset and drives the
//! ambient loop players. All node construction failures are logged and turn
//! the affected sound into a no-op.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use thiserror::Error;
use wasm_bindgen::JsValue;
use web_sys::{
    AudioContext, AudioNode, BiquadFilterType, ConvolverNode, GainNode, HtmlAudioElement,
    OscillatorType,
};

use crate::consts::NOTE_DURATION_SECS;
use crate::params::Param;
use crate::sim::ChordTrigger;
use crate::synth::{
    Effect, Instrument, LoopAction, LoopState, Preset, Ramp, Routing, VoicePool, Waveform, db_to_gain,
    impulse_noise, voicing,
};

const IMPULSE_SEED: u64 = 0x5EED_1234;

/// Audio setup failures
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio context unavailable")]
    NoContext,
    #[error("failed to create {node}: {message}")]
    Node { node: &'static str, message: String },
    #[error("failed to load {0}")]
    Asset(String),
}

impl AudioError {
    fn node(node: &'static str) -> impl FnOnce(JsValue) -> Self {
        move |e| AudioError::Node {
            node,
            message: format!("{e:?}"),
        }
    }
}

fn create_gain(ctx: &AudioContext, value: f32) -> Result<GainNode, AudioError> {
    let gain = ctx.create_gain().map_err(AudioError::node("GainNode"))?;
    gain.gain().set_value(value);
    Ok(gain)
}

fn connect(from: &AudioNode, to: &AudioNode) -> Result<(), AudioError> {
    from.connect_with_audio_node(to)
        .map(|_| ())
        .map_err(AudioError::node("connection"))
}

/// Procedural stereo impulse response, one seeded noise tail per channel
fn impulse_response(ctx: &AudioContext, decay: f64) -> Result<ConvolverNode, AudioError> {
    let reverb = ctx.create_convolver().map_err(AudioError::node("ConvolverNode"))?;
    reverb.set_normalize(true);
    let sample_rate = ctx.sample_rate();
    let len = ((sample_rate as f64) * decay).max(1.0) as u32;
    let ir = ctx
        .create_buffer(2, len, sample_rate)
        .map_err(AudioError::node("AudioBuffer"))?;
    for channel in 0..2 {
        let mut buf = impulse_noise(IMPULSE_SEED + channel as u64, sample_rate, decay);
        ir.copy_to_channel(&mut buf, channel)
            .map_err(AudioError::node("impulse response"))?;
    }
    reverb.set_buffer(Some(&ir));
    Ok(reverb)
}

/// Build one effect stage; returns (input, output)
fn build_effect(ctx: &AudioContext, effect: &Effect) -> Result<(AudioNode, AudioNode), AudioError> {
    match *effect {
        Effect::Lowpass { frequency, q } => {
            let filter = ctx
                .create_biquad_filter()
                .map_err(AudioError::node("BiquadFilterNode"))?;
            filter.set_type(BiquadFilterType::Lowpass);
            filter.frequency().set_value(frequency);
            filter.q().set_value(q);
            Ok((filter.clone().into(), filter.into()))
        }
        Effect::Reverb {
            decay,
            wet,
            pre_delay,
        } => {
            let input = create_gain(ctx, 1.0)?;
            let output = create_gain(ctx, 1.0)?;
            let dry = create_gain(ctx, 1.0 - wet)?;
            let wet_gain = create_gain(ctx, wet)?;
            let delay = ctx
                .create_delay_with_max_delay_time(pre_delay.max(0.01) + 0.01)
                .map_err(AudioError::node("DelayNode"))?;
            delay.delay_time().set_value(pre_delay as f32);
            let reverb = impulse_response(ctx, decay)?;
            connect(&input, &dry)?;
            connect(&dry, &output)?;
            connect(&input, &delay)?;
            connect(&delay, &reverb)?;
            connect(&reverb, &wet_gain)?;
            connect(&wet_gain, &output)?;
            Ok((input.into(), output.into()))
        }
        Effect::FeedbackDelay { delay, feedback } => {
            let input = create_gain(ctx, 1.0)?;
            let output = create_gain(ctx, 1.0)?;
            let echo = ctx
                .create_delay_with_max_delay_time(delay + 0.1)
                .map_err(AudioError::node("DelayNode"))?;
            echo.delay_time().set_value(delay as f32);
            let loop_gain = create_gain(ctx, feedback)?;
            connect(&input, &output)?;
            connect(&input, &echo)?;
            connect(&echo, &loop_gain)?;
            connect(&loop_gain, &echo)?;
            connect(&echo, &output)?;
            Ok((input.into(), output.into()))
        }
        Effect::PingPong { delay, feedback } => {
            let input = create_gain(ctx, 1.0)?;
            let output = create_gain(ctx, 1.0)?;
            let left = ctx
                .create_delay_with_max_delay_time(delay + 0.1)
                .map_err(AudioError::node("DelayNode"))?;
            let right = ctx
                .create_delay_with_max_delay_time(delay + 0.1)
                .map_err(AudioError::node("DelayNode"))?;
            left.delay_time().set_value(delay as f32);
            right.delay_time().set_value(delay as f32);
            let pan_left = ctx.create_stereo_panner().map_err(AudioError::node("StereoPannerNode"))?;
            let pan_right = ctx.create_stereo_panner().map_err(AudioError::node("StereoPannerNode"))?;
            pan_left.pan().set_value(-1.0);
            pan_right.pan().set_value(1.0);
            let loop_gain = create_gain(ctx, feedback)?;
            connect(&input, &output)?;
            connect(&input, &left)?;
            connect(&left, &pan_left)?;
            connect(&pan_left, &output)?;
            connect(&left, &right)?;
            connect(&right, &pan_right)?;
            connect(&pan_right, &output)?;
            connect(&right, &loop_gain)?;
            connect(&loop_gain, &left)?;
            Ok((input.into(), output.into()))
        }
    }
}

/// Input node of an instrument's effect chain, already routed to `master`
fn build_chain(ctx: &AudioContext, preset: &Preset, master: &GainNode) -> Result<GainNode, AudioError> {
    let input = create_gain(ctx, 1.0)?;
    if preset.effects.is_empty() {
        connect(&input, master)?;
        return Ok(input);
    }
    match preset.routing {
        Routing::Serial => {
            let mut tail: AudioNode = input.clone().into();
            for effect in preset.effects {
                let (stage_in, stage_out) = build_effect(ctx, effect)?;
                connect(&tail, &stage_in)?;
                tail = stage_out;
            }
            connect(&tail, master)?;
        }
        Routing::Parallel => {
            for effect in preset.effects {
                let (stage_in, stage_out) = build_effect(ctx, effect)?;
                connect(&input, &stage_in)?;
                connect(&stage_out, master)?;
            }
        }
    }
    Ok(input)
}

/// A looped ambient recording behind a volume node
struct AmbientLoop {
    name: &'static str,
    element: Option<HtmlAudioElement>,
    volume: Option<GainNode>,
    state: LoopState,
}

impl AmbientLoop {
    fn new(ctx: Option<&AudioContext>, name: &'static str, url: &str) -> Self {
        let mut state = LoopState::default();
        let nodes = ctx.ok_or(AudioError::NoContext).and_then(|ctx| {
            let element =
                HtmlAudioElement::new_with_src(url).map_err(|_| AudioError::Asset(url.to_string()))?;
            element.set_loop(true);
            let source = ctx
                .create_media_element_source(&element)
                .map_err(AudioError::node("MediaElementAudioSourceNode"))?;
            let volume = create_gain(ctx, 1.0)?;
            connect(&source, &volume)?;
            connect(&volume, &ctx.destination())?;
            Ok((element, volume))
        });
        match nodes {
            Ok((element, volume)) => Self {
                name,
                element: Some(element),
                volume: Some(volume),
                state,
            },
            Err(e) => {
                log::warn!("{name} loop disabled: {e}");
                state.fail(e.to_string());
                Self {
                    name,
                    element: None,
                    volume: None,
                    state,
                }
            }
        }
    }

    fn set_volume_db(&mut self, db: f32) {
        if let Some(element) = &self.element {
            if element.error().is_some() && self.state.error().is_none() {
                log::warn!("{} loop failed to load", self.name);
                self.state.fail(format!("{} asset failed to load", self.name));
            }
        }
        let action = self.state.set_volume(db);
        if let Some(volume) = &self.volume {
            volume.gain().set_value(db_to_gain(db));
        }
        let Some(element) = &self.element else { return };
        match action {
            LoopAction::Start => {
                if let Err(e) = element.play() {
                    log::warn!("{} loop failed to start: {e:?}", self.name);
                }
            }
            LoopAction::Stop => {
                let _ = element.pause();
                element.set_current_time(0.0);
            }
            LoopAction::Keep => {}
        }
    }
}

/// Audio manager for the sequencer
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master: Option<GainNode>,
    instrument: Instrument,
    /// Effect chain input per instrument, built on first use
    chains: [Option<GainNode>; 4],
    voices: VoicePool,
    rng: Pcg32,
    rain: AmbientLoop,
    vinyl: AmbientLoop,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AudioManager {
    pub fn new(seed: u64) -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        let master = ctx.as_ref().and_then(|ctx| {
            let master = create_gain(ctx, 0.8)
                .and_then(|g| connect(&g, &ctx.destination()).map(|_| g));
            master.map_err(|e| log::warn!("Master bus unavailable: {e}")).ok()
        });
        let rain = AmbientLoop::new(ctx.as_ref(), "rain", "audio/rain.mp3");
        let vinyl = AmbientLoop::new(ctx.as_ref(), "vinyl sim", "audio/vinyl-sim.mp3");
        Self {
            ctx,
            master,
            instrument: Instrument::default(),
            chains: Default::default(),
            voices: VoicePool::default(),
            rng: Pcg32::seed_from_u64(seed),
            rain,
            vinyl,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn set_instrument(&mut self, instrument: Instrument) {
        if instrument != self.instrument {
            log::info!("Instrument: {}", instrument.label());
            self.instrument = instrument;
        }
    }

    /// Apply an ambient volume knob
    pub fn set_loop_volume(&mut self, param: Param, volume_db: f32) {
        match param {
            Param::Rain => self.rain.set_volume_db(volume_db),
            Param::VinylSim => self.vinyl.set_volume_db(volume_db),
            _ => {}
        }
    }

    fn chain(&mut self, ctx: &AudioContext) -> Option<GainNode> {
        let slot = Instrument::ALL.iter().position(|i| *i == self.instrument)?;
        if self.chains[slot].is_none() {
            let master = self.master.as_ref()?;
            match build_chain(ctx, &self.instrument.preset(), master) {
                Ok(input) => self.chains[slot] = Some(input),
                Err(e) => {
                    log::warn!("{} chain unavailable: {e}", self.instrument.label());
                    return None;
                }
            }
        }
        self.chains[slot].clone()
    }

    /// Play a chord trigger, subject to the polyphony cap
    pub fn play(&mut self, trigger: &ChordTrigger) {
        let Some(ctx) = self.ctx.clone() else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let chain = self.chain(&ctx);
        if chain.is_none() {
            return;
        }

        let preset = self.instrument.preset();
        let now = ctx.current_time();
        let lifetime = preset.envelope.voice_lifetime(NOTE_DURATION_SECS);
        let Some((chain, granted)) = self.voices.admit_into(chain, now, trigger.chord.len(), lifetime) else {
            log::debug!("Polyphony full, dropped {}", trigger.ball);
            return;
        };

        let frequencies = voicing(&preset, &trigger.chord, &mut self.rng);
        for freq in frequencies.into_iter().take(granted) {
            self.play_voice(&ctx, &preset, freq, now, &chain);
        }
    }

    /// Create an oscillator with gain envelope
    fn play_voice(&self, ctx: &AudioContext, preset: &Preset, freq: f32, start: f64, chain: &GainNode) {
        let (Ok(osc), Ok(gain)) = (ctx.create_oscillator(), ctx.create_gain()) else {
            return;
        };
        osc.set_type(match preset.waveform {
            Waveform::Sine => OscillatorType::Sine,
            Waveform::Triangle => OscillatorType::Triangle,
        });
        osc.frequency().set_value(freq);
        osc.detune().set_value(preset.detune_cents);
        if osc.connect_with_audio_node(&gain).is_err() || gain.connect_with_audio_node(chain).is_err() {
            return;
        }

        let param = gain.gain();
        let points = preset.envelope.schedule(start, NOTE_DURATION_SECS, preset.gain);
        for point in &points {
            match point.ramp {
                Ramp::Set => param.set_value_at_time(point.level, point.time).ok(),
                Ramp::Linear => param.linear_ramp_to_value_at_time(point.level, point.time).ok(),
            };
        }

        let end = points.last().map_or(start, |p| p.time);
        osc.start_with_when(start).ok();
        osc.stop_with_when(end + 0.05).ok();
    }
}
