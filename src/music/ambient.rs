//! Generative ambient soundtrack
//!
//! An [`AmbientEngine`] runs at most one session at a time. A session is a
//! set of [`Layer`]s started together and stopped together:
//!
//! - **lofi**: four sine tones on a low A chord, each fading in over two
//!   seconds and picking up a slow frequency wobble one second after the
//!   previous layer
//! - **nature**: a looped two-second pink noise buffer through a gentle
//!   low-pass
//!
//! All layers mix into the ambient bus, so volume changes move the whole
//! session without touching the balance between layers.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};

use crate::config::{clamp_unit, DEFAULT_MUSIC_VOLUME};
use crate::dsp::{Envelope, FilterKind, Waveform};
use crate::engine::{Bus, DeviceSession, Lfo, Voice, VoiceId};
use crate::error::{MindclearError, Result};
use crate::rng::Rng;
use crate::synth::{NoiseSynthesizer, ToneSynthesizer};

/// Base frequencies of the lofi chord (A1, E2, A2, E3)
pub const LOFI_FREQUENCIES: [f64; 4] = [55.0, 82.5, 110.0, 165.0];

/// Level each lofi tone fades in to
pub const LOFI_LEVEL: f32 = 0.02;

/// Lofi fade-in time in seconds
pub const LOFI_FADE_IN: f64 = 2.0;

/// Delay between successive layers' wobble onsets, in seconds
pub const LFO_STAGGER: f64 = 1.0;

/// Wobble depth in Hz
pub const LFO_DEPTH: f64 = 2.0;

const LFO_RATE_MIN: f64 = 0.1;
const LFO_RATE_MAX: f64 = 0.3;

/// Length of the looped pink noise buffer in seconds
pub const NATURE_BUFFER_SECS: f64 = 2.0;

const NATURE_CUTOFF: f32 = 800.0;
const NATURE_Q: f64 = 0.5;
const NATURE_LEVEL: f32 = 0.03;

/// Which composition a session plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbientKind {
    Lofi,
    Nature,
}

impl AmbientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientKind::Lofi => "lofi",
            AmbientKind::Nature => "nature",
        }
    }
}

impl fmt::Display for AmbientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmbientKind {
    type Err = MindclearError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lofi" => Ok(AmbientKind::Lofi),
            "nature" => Ok(AmbientKind::Nature),
            other => Err(MindclearError::InvalidConfig {
                reason: format!("unknown ambient kind '{}' (expected lofi or nature)", other),
            }),
        }
    }
}

/// One running component of an ambient session
#[derive(Debug, Clone)]
pub enum Layer {
    /// Filtered sine tone with a slow frequency wobble
    Tone {
        voice: VoiceId,
        frequency: f64,
        lfo: Lfo,
    },
    /// Looped noise buffer
    Noise { voice: VoiceId },
}

impl Layer {
    pub fn voice(&self) -> VoiceId {
        match self {
            Layer::Tone { voice, .. } | Layer::Noise { voice } => *voice,
        }
    }
}

#[derive(Debug)]
struct AmbientSession {
    kind: AmbientKind,
    layers: Vec<Layer>,
}

/// Starts and stops the ambient session
#[derive(Debug)]
pub struct AmbientEngine {
    session: Option<AmbientSession>,
    volume: f32,
    rng: Rng,
    noise: NoiseSynthesizer,
}

impl Default for AmbientEngine {
    fn default() -> Self {
        Self::new(Rng::default())
    }
}

impl AmbientEngine {
    pub fn new(mut rng: Rng) -> Self {
        let noise = NoiseSynthesizer::new(rng.fork());
        Self {
            session: None,
            volume: DEFAULT_MUSIC_VOLUME,
            rng,
            noise,
        }
    }

    /// Start from `volume` instead of the default level
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp_unit(volume);
        self
    }

    /// Start a session of `kind`
    ///
    /// Returns `false` without side effects when a session is already
    /// playing or the device is disabled.
    pub fn start(&mut self, device: &mut DeviceSession, kind: AmbientKind) -> bool {
        if let Some(session) = self.session.as_ref() {
            debug!(
                "Ambient {} already playing; ignoring start({})",
                session.kind, kind
            );
            return false;
        }
        if !device.ensure_ready() {
            return false;
        }

        let now = device.now();
        let layers = match kind {
            AmbientKind::Lofi => self.lofi_layers(device, now),
            AmbientKind::Nature => self.nature_layers(device, now),
        };

        info!("Ambient {} started with {} layers", kind, layers.len());
        self.session = Some(AmbientSession { kind, layers });
        true
    }

    fn lofi_layers(&mut self, device: &mut DeviceSession, now: f64) -> Vec<Layer> {
        let mut layers = Vec::with_capacity(LOFI_FREQUENCIES.len());
        for (index, &frequency) in LOFI_FREQUENCIES.iter().enumerate() {
            let lfo = Lfo::new(
                self.rng.rand_between(LFO_RATE_MIN, LFO_RATE_MAX),
                LFO_DEPTH,
                now + index as f64 * LFO_STAGGER,
            );
            let voice = ToneSynthesizer::sustained_voice(
                frequency,
                Waveform::Sine,
                LOFI_LEVEL,
                LOFI_FADE_IN,
                now,
            )
            .with_lfo(lfo.clone())
            .on_bus(Bus::Ambient);

            if let Some(id) = device.schedule(voice) {
                layers.push(Layer::Tone {
                    voice: id,
                    frequency,
                    lfo,
                });
            }
        }
        layers
    }

    fn nature_layers(&mut self, device: &mut DeviceSession, now: f64) -> Vec<Layer> {
        let buffer = self
            .noise
            .pink_noise(NATURE_BUFFER_SECS, device.sample_rate());
        let voice = Voice::buffer(buffer, true)
            .with_filter(
                FilterKind::LowPass,
                NATURE_Q,
                Envelope::constant(NATURE_CUTOFF),
            )
            .with_gain(Envelope::constant(NATURE_LEVEL))
            .on_bus(Bus::Ambient)
            .starting_at(now);

        device
            .schedule(voice)
            .map(|id| vec![Layer::Noise { voice: id }])
            .unwrap_or_default()
    }

    /// Stop every layer and return to idle; does nothing when idle
    pub fn stop(&mut self, device: &mut DeviceSession) {
        let Some(session) = self.session.take() else {
            return;
        };
        for layer in &session.layers {
            match layer {
                Layer::Tone { voice, .. } => device.stop_voice(*voice),
                Layer::Noise { voice } => device.stop_voice(*voice),
            }
        }
        info!(
            "Ambient {} stopped ({} layers released)",
            session.kind,
            session.layers.len()
        );
    }

    /// Set the session level, clamped to `[0, 1]`
    ///
    /// Applied to the ambient bus, scaled by the configured ambient scale.
    pub fn set_volume(&mut self, device: &mut DeviceSession, volume: f32) {
        self.volume = clamp_unit(volume);
        let scale = device.config().ambient_scale;
        device.set_bus_gain(Bus::Ambient, self.volume * scale);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn kind(&self) -> Option<AmbientKind> {
        self.session.as_ref().map(|s| s.kind)
    }

    pub fn layers(&self) -> &[Layer] {
        self.session
            .as_ref()
            .map(|s| s.layers.as_slice())
            .unwrap_or(&[])
    }

    pub fn layer_count(&self) -> usize {
        self.layers().len()
    }
}
