//! Noise buffer synthesis
//!
//! Buffers are generated once on the control thread and shared with the
//! renderer through `Arc<[f32]>`, so a looping layer never regenerates them.

use std::sync::Arc;

use crate::dsp::{Envelope, EnvelopeStage, FilterKind};
use crate::engine::{Bus, Voice};
use crate::rng::Rng;

/// Output scale of the pink noise filter bank
const PINK_GAIN: f32 = 0.11;

/// Probability that a burn sample carries a crackle impulse
const CRACKLE_PROBABILITY: f64 = 0.1;

/// Maximum crackle impulse height
const CRACKLE_HEIGHT: f32 = 0.5;

/// Level of the decaying white noise under the crackles
const BURN_NOISE_LEVEL: f32 = 0.3;

/// Decay constant of the burn noise, as a fraction of its length
const BURN_DECAY_FRACTION: f32 = 0.2;

/// Generates noise buffers from a seeded or time-seeded [`Rng`]
#[derive(Debug, Default)]
pub struct NoiseSynthesizer {
    rng: Rng,
}

impl NoiseSynthesizer {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }

    pub fn with_seed(seed: u128) -> Self {
        Self::new(Rng::new_with_seed(seed))
    }

    /// Pink noise, roughly -3 dB per octave
    ///
    /// White noise through a bank of seven one-pole filters (Paul Kellet's
    /// refined method).
    pub fn pink_noise(&mut self, duration: f64, sample_rate: u32) -> Arc<[f32]> {
        let len = buffer_len(duration, sample_rate);
        let mut b = [0.0_f32; 7];
        let mut out = Vec::with_capacity(len);

        for _ in 0..len {
            let white = self.rng.white();
            b[0] = 0.99886 * b[0] + white * 0.0555179;
            b[1] = 0.99332 * b[1] + white * 0.0750759;
            b[2] = 0.969 * b[2] + white * 0.153852;
            b[3] = 0.8665 * b[3] + white * 0.3104856;
            b[4] = 0.55 * b[4] + white * 0.5329522;
            b[5] = -0.7616 * b[5] - white * 0.016898;
            let pink = b.iter().sum::<f32>() + white * 0.5362;
            out.push(pink * PINK_GAIN);
            b[6] = white * 0.115926;
        }

        Arc::from(out)
    }

    /// Exponentially decaying white noise with sparse random crackles
    pub fn crackle(&mut self, duration: f64, sample_rate: u32) -> Arc<[f32]> {
        let len = buffer_len(duration, sample_rate);
        let decay_len = len as f32 * BURN_DECAY_FRACTION;
        let mut out = Vec::with_capacity(len);

        for i in 0..len {
            let decay = if decay_len > 0.0 {
                (-(i as f32) / decay_len).exp()
            } else {
                0.0
            };
            let noise = self.rng.white() * decay * BURN_NOISE_LEVEL;
            let crackle = if self.rng.rand_float() < CRACKLE_PROBABILITY {
                self.rng.rand_float() as f32 * CRACKLE_HEIGHT
            } else {
                0.0
            };
            out.push(noise + crackle);
        }

        Arc::from(out)
    }

    /// The burn cue: crackle through a band-pass sweeping 1500 -> 200 Hz
    ///
    /// Gain decays exponentially from `peak` over `duration` seconds.
    pub fn burn_voice(&mut self, duration: f64, peak: f32, sample_rate: u32, start: f64) -> Voice {
        let buffer = self.crackle(duration, sample_rate);
        let gain = Envelope::starting_at(peak)
            .then(EnvelopeStage::set(0.0, peak))
            .then(EnvelopeStage::exponential(duration, 0.001));

        Voice::buffer(buffer, false)
            .with_filter(
                FilterKind::BandPass,
                2.0,
                Envelope::exponential_sweep(1500.0, 200.0, duration),
            )
            .with_gain(gain)
            .on_bus(Bus::Effects)
            .starting_at(start)
            .stopping_at(start + duration)
    }
}

fn buffer_len(duration: f64, sample_rate: u32) -> usize {
    if duration.is_finite() && duration > 0.0 {
        (duration * sample_rate as f64).round() as usize
    } else {
        0
    }
}
