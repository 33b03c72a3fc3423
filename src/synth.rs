//! Synth model: instrument presets, envelopes, voice pool, ambient loops
//!
//! Everything here is plain data and arithmetic so it runs in native tests.
//! `audio` turns it into Web Audio nodes.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::chords::Chord;
use crate::consts::MAX_POLYPHONY;

/// Quarter note at 120 BPM (seconds)
pub const QUARTER_NOTE_SECS: f64 = 0.5;

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

/// Attack/decay/sustain/release envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    /// Sustain level relative to peak
    pub sustain: f32,
    pub release: f64,
}

/// How the gain moves into a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Jump to the level
    Set,
    /// Linear ramp ending at the breakpoint
    Linear,
}

/// One gain automation point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub time: f64,
    pub level: f32,
    pub ramp: Ramp,
}

impl Adsr {
    pub const fn new(attack: f64, decay: f64, sustain: f32, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Level (0..=1 of peak) `t` seconds after note-on while the key is held
    pub fn level_at(&self, t: f64) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return (t / self.attack) as f32;
        }
        let t = t - self.attack;
        if t < self.decay {
            let progress = (t / self.decay) as f32;
            return 1.0 + (self.sustain - 1.0) * progress;
        }
        self.sustain
    }

    /// Seconds a voice stays busy for a note held `hold` seconds
    pub fn voice_lifetime(&self, hold: f64) -> f64 {
        hold + self.release
    }

    /// Gain automation for a note starting at `start`, held `hold` seconds
    ///
    /// The release starts from whatever level the envelope reached when the
    /// hold ended, so short notes never jump up to the peak.
    pub fn schedule(&self, start: f64, hold: f64, peak: f32) -> Vec<Breakpoint> {
        let hold = hold.max(0.0);
        let mut points = vec![Breakpoint {
            time: start,
            level: 0.0,
            ramp: Ramp::Set,
        }];

        if hold <= self.attack {
            points.push(Breakpoint {
                time: start + hold,
                level: peak * self.level_at(hold),
                ramp: Ramp::Linear,
            });
        } else {
            points.push(Breakpoint {
                time: start + self.attack,
                level: peak,
                ramp: Ramp::Linear,
            });
            let decay_end = self.attack + self.decay;
            if hold < decay_end {
                points.push(Breakpoint {
                    time: start + hold,
                    level: peak * self.level_at(hold),
                    ramp: Ramp::Linear,
                });
            } else {
                points.push(Breakpoint {
                    time: start + decay_end,
                    level: peak * self.sustain,
                    ramp: Ramp::Linear,
                });
                points.push(Breakpoint {
                    time: start + hold,
                    level: peak * self.sustain,
                    ramp: Ramp::Linear,
                });
            }
        }

        points.push(Breakpoint {
            time: start + self.voice_lifetime(hold),
            level: 0.0,
            ramp: Ramp::Linear,
        });
        points
    }
}

/// Effect stage after the oscillators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Lowpass { frequency: f32, q: f32 },
    Reverb { decay: f64, wet: f32, pre_delay: f64 },
    /// Alternating left/right echoes
    PingPong { delay: f64, feedback: f32 },
    /// Mono echo that feeds the next stage
    FeedbackDelay { delay: f64, feedback: f32 },
}

/// How effect stages are wired between the voices and the master bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Each stage feeds the next
    Serial,
    /// Every stage takes the voices directly; outputs are summed
    Parallel,
}

/// Static description of an instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub waveform: Waveform,
    pub detune_cents: f32,
    pub envelope: Adsr,
    pub effects: &'static [Effect],
    pub routing: Routing,
    /// Each note lands in octave 5 or 6 at random
    pub random_octave: bool,
    /// Peak gain per voice
    pub gain: f32,
}

/// Selectable instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Instrument {
    #[default]
    Detune,
    Pad,
    Shimmer,
    Ambient,
}

const DETUNE_EFFECTS: &[Effect] = &[
    Effect::Lowpass {
        frequency: 200.0,
        q: 1.0,
    },
    Effect::Reverb {
        decay: 6.0,
        wet: 0.8,
        pre_delay: 0.5,
    },
];

const SHIMMER_EFFECTS: &[Effect] = &[
    Effect::PingPong {
        delay: QUARTER_NOTE_SECS,
        feedback: 0.5,
    },
    Effect::Reverb {
        decay: 5.0,
        wet: 1.0,
        pre_delay: 0.0,
    },
];

const AMBIENT_EFFECTS: &[Effect] = &[
    Effect::FeedbackDelay {
        delay: QUARTER_NOTE_SECS,
        feedback: 0.6,
    },
    Effect::Reverb {
        decay: 6.0,
        wet: 0.8,
        pre_delay: 0.5,
    },
];

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Detune,
        Instrument::Pad,
        Instrument::Shimmer,
        Instrument::Ambient,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Instrument::Detune => "Detune",
            Instrument::Pad => "Pad",
            Instrument::Shimmer => "Shimmer",
            Instrument::Ambient => "Ambient",
        }
    }

    /// Number keys 1-4 pick an instrument
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "1" => Some(Instrument::Detune),
            "2" => Some(Instrument::Pad),
            "3" => Some(Instrument::Shimmer),
            "4" => Some(Instrument::Ambient),
            _ => None,
        }
    }

    pub fn preset(&self) -> Preset {
        match self {
            Instrument::Detune => Preset {
                waveform: Waveform::Triangle,
                detune_cents: -15.0,
                envelope: Adsr::new(1.0, 0.2, 0.5, 1.2),
                effects: DETUNE_EFFECTS,
                routing: Routing::Serial,
                random_octave: false,
                gain: 0.25,
            },
            Instrument::Pad => Preset {
                waveform: Waveform::Sine,
                detune_cents: 0.0,
                envelope: Adsr::new(2.0, 3.0, 0.4, 4.0),
                effects: &[],
                routing: Routing::Serial,
                random_octave: false,
                gain: 0.15,
            },
            Instrument::Shimmer => Preset {
                waveform: Waveform::Sine,
                detune_cents: 0.0,
                envelope: Adsr::new(0.1, 0.2, 1.0, 4.0),
                effects: SHIMMER_EFFECTS,
                routing: Routing::Parallel,
                random_octave: true,
                gain: 0.12,
            },
            Instrument::Ambient => Preset {
                waveform: Waveform::Sine,
                detune_cents: 0.0,
                envelope: Adsr::new(3.0, 2.0, 0.3, 4.0),
                effects: AMBIENT_EFFECTS,
                routing: Routing::Serial,
                random_octave: false,
                gain: 0.15,
            },
        }
    }
}

/// Oscillator frequencies for a chord on this preset
pub fn voicing(preset: &Preset, chord: &Chord, rng: &mut Pcg32) -> Vec<f32> {
    chord
        .notes()
        .iter()
        .map(|note| {
            if preset.random_octave {
                let octave = if rng.random_bool(0.5) { 5 } else { 6 };
                note.with_octave(octave).frequency()
            } else {
                note.frequency()
            }
        })
        .collect()
}

/// One channel of a reverb impulse response: noise decaying to -60 dB at `decay`
pub fn impulse_noise(seed: u64, sample_rate: f32, decay: f64) -> Vec<f32> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let len = ((sample_rate as f64) * decay).max(1.0) as usize;
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let noise: f32 = rng.random_range(-1.0..1.0);
            noise * (-6.9 * t / decay).exp() as f32
        })
        .collect()
}

/// Counts sounding voices until their release finishes
#[derive(Debug, Clone)]
pub struct VoicePool {
    capacity: usize,
    /// Release end time of each busy voice
    busy_until: Vec<f64>,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new(MAX_POLYPHONY)
    }
}

impl VoicePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            busy_until: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Voices still sounding at `now`
    pub fn active(&mut self, now: f64) -> usize {
        self.busy_until.retain(|&end| end > now);
        self.busy_until.len()
    }

    /// Reserve up to `wanted` voices that stay busy for `lifetime` seconds
    ///
    /// Returns how many were granted; the rest are dropped.
    pub fn admit(&mut self, now: f64, wanted: usize, lifetime: f64) -> usize {
        let free = self.capacity.saturating_sub(self.active(now));
        let granted = wanted.min(free);
        self.busy_until
            .extend(std::iter::repeat_n(now + lifetime, granted));
        granted
    }

    /// `admit` only when there is an output to sound on
    ///
    /// A missing output reserves nothing. Returns the output with the granted
    /// voice count, or `None` when nothing will play.
    pub fn admit_into<T>(&mut self, output: Option<T>, now: f64, wanted: usize, lifetime: f64) -> Option<(T, usize)> {
        let output = output?;
        match self.admit(now, wanted, lifetime) {
            0 => None,
            granted => Some((output, granted)),
        }
    }
}

/// Convert decibels to linear gain
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// What a loop player has to do after a volume change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Start,
    Stop,
    Keep,
}

/// Playback state of an ambient loop (rain, vinyl crackle)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopState {
    playing: bool,
    volume_db: f32,
    error: Option<String>,
}

impl LoopState {
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Remember a load failure; the loop stays silent from now on
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.playing = false;
    }

    /// Apply a new volume; zero stops, anything above starts if idle
    pub fn set_volume(&mut self, volume_db: f32) -> LoopAction {
        self.volume_db = volume_db;
        if self.error.is_some() {
            return LoopAction::Keep;
        }
        if volume_db > 0.0 {
            if self.playing {
                LoopAction::Keep
            } else {
                self.playing = true;
                LoopAction::Start
            }
        } else if self.playing {
            self.playing = false;
            LoopAction::Stop
        } else {
            LoopAction::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::ChordTable;
    use crate::consts::NOTE_DURATION_SECS;

    #[test]
    fn test_envelope_levels() {
        let env = Adsr::new(1.0, 0.2, 0.5, 1.2);
        assert_eq!(env.level_at(0.0), 0.0);
        assert!((env.level_at(0.5) - 0.5).abs() < 1e-6);
        assert!((env.level_at(1.1) - 0.75).abs() < 1e-5);
        assert_eq!(env.level_at(10.0), 0.5);
    }

    #[test]
    fn test_short_note_releases_from_reached_level() {
        let env = Instrument::Detune.preset().envelope;
        let points = env.schedule(2.0, NOTE_DURATION_SECS, 1.0);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].ramp, Ramp::Set);
        // Attack cut short at a quarter of the peak
        assert!((points[1].time - 2.25).abs() < 1e-9);
        assert!((points[1].level - 0.25).abs() < 1e-6);
        let last = points[2];
        assert_eq!(last.level, 0.0);
        assert!((last.time - (2.0 + NOTE_DURATION_SECS + 1.2)).abs() < 1e-9);
    }

    #[test]
    fn test_long_note_reaches_sustain() {
        let env = Adsr::new(0.1, 0.2, 0.6, 1.0);
        let points = env.schedule(0.0, 2.0, 0.5);
        let levels: Vec<f32> = points.iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![0.0, 0.5, 0.3, 0.3, 0.0]);
        assert!(points.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_voice_pool_drops_when_full() {
        let mut pool = VoicePool::default();
        let lifetime = Instrument::Detune
            .preset()
            .envelope
            .voice_lifetime(NOTE_DURATION_SECS);
        for _ in 0..6 {
            assert_eq!(pool.admit(0.0, 4, lifetime), 4);
        }
        assert_eq!(pool.active(0.1), MAX_POLYPHONY);
        assert_eq!(pool.admit(0.1, 4, lifetime), 0);
        assert_eq!(pool.active(0.1), MAX_POLYPHONY);
        // Everything has finished releasing
        assert_eq!(pool.admit(lifetime + 0.01, 3, lifetime), 3);
    }

    #[test]
    fn test_voice_pool_partial_admission() {
        let mut pool = VoicePool::new(5);
        assert_eq!(pool.admit(0.0, 4, 1.0), 4);
        assert_eq!(pool.admit(0.0, 4, 1.0), 1);
        assert_eq!(pool.active(0.5), 5);
    }

    #[test]
    fn test_instrument_keys() {
        for (i, instrument) in Instrument::ALL.into_iter().enumerate() {
            assert_eq!(Instrument::from_key(&(i + 1).to_string()), Some(instrument));
        }
        assert_eq!(Instrument::from_key("5"), None);
        assert_eq!(Instrument::default(), Instrument::Detune);
    }

    #[test]
    fn test_shimmer_voicing_octaves() {
        let chord = ChordTable::default().chord_for_key("z").unwrap().clone();
        let mut rng = Pcg32::seed_from_u64(7);
        let shimmer = Instrument::Shimmer.preset();
        for _ in 0..20 {
            let freqs = voicing(&shimmer, &chord, &mut rng);
            assert_eq!(freqs.len(), chord.len());
            for (freq, note) in freqs.iter().zip(chord.notes()) {
                let candidates = [note.with_octave(5).frequency(), note.with_octave(6).frequency()];
                assert!(candidates.iter().any(|c| (c - freq).abs() < 1e-3));
            }
        }

        let plain = voicing(&Instrument::Pad.preset(), &chord, &mut rng);
        let expected: Vec<f32> = chord.frequencies().collect();
        assert_eq!(plain, expected);
    }

    #[test]
    fn test_loop_start_stop() {
        let mut rain = LoopState::default();
        assert_eq!(rain.set_volume(0.0), LoopAction::Keep);
        assert_eq!(rain.set_volume(5.0), LoopAction::Start);
        assert_eq!(rain.set_volume(12.0), LoopAction::Keep);
        assert!(rain.is_playing());
        assert_eq!(rain.set_volume(0.0), LoopAction::Stop);
        assert!(!rain.is_playing());
    }

    #[test]
    fn test_failed_loop_is_noop() {
        let mut vinyl = LoopState::default();
        vinyl.fail("404");
        assert_eq!(vinyl.set_volume(20.0), LoopAction::Keep);
        assert!(!vinyl.is_playing());
        assert_eq!(vinyl.error(), Some("404"));
    }

    #[test]
    fn test_db_to_gain() {
        assert_eq!(db_to_gain(0.0), 1.0);
        assert!((db_to_gain(20.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_impulse_noise_decays() {
        let ir = impulse_noise(7, 1000.0, 2.0);
        assert_eq!(ir.len(), 2000);
        assert!(ir.iter().all(|s| s.abs() <= 1.0));

        let energy = |part: &[f32]| part.iter().map(|s| s * s).sum::<f32>();
        assert!(energy(&ir[..200]) > energy(&ir[1800..]) * 100.0);

        // Same seed, same response; channels differ by seed
        assert_eq!(ir, impulse_noise(7, 1000.0, 2.0));
        assert_ne!(ir, impulse_noise(8, 1000.0, 2.0));
    }

    #[test]
    fn test_missing_output_reserves_nothing() {
        let mut pool = VoicePool::default();
        assert_eq!(pool.admit_into(None::<()>, 0.0, 4, 2.0), None);
        assert_eq!(pool.active(0.0), 0);

        assert_eq!(pool.admit_into(Some("bus"), 0.0, 4, 2.0), Some(("bus", 4)));
        assert_eq!(pool.active(0.0), 4);

        pool.admit(0.0, MAX_POLYPHONY, 2.0);
        assert_eq!(pool.admit_into(Some("bus"), 1.0, 1, 2.0), None);
    }

    #[test]
    fn test_shimmer_splits_into_delay_and_reverb() {
        let shimmer = Instrument::Shimmer.preset();
        assert_eq!(shimmer.routing, Routing::Parallel);
        assert!(matches!(shimmer.effects, [Effect::PingPong { .. }, Effect::Reverb { .. }]));

        // Ambient's delay feeds its reverb
        let ambient = Instrument::Ambient.preset();
        assert_eq!(ambient.routing, Routing::Serial);
        assert!(matches!(ambient.effects, [Effect::FeedbackDelay { .. }, Effect::Reverb { .. }]));
    }
}
