//! Enveloped tone synthesis
//!
//! Every tone is oscillator -> low-pass (cutoff at twice the fundamental,
//! Q 1) -> gain envelope. One-shot tones use a four-stage envelope: silence,
//! linear attack to peak, linear decay to a sustain level, then an
//! exponential release that reaches near-silence at the tone's duration.

use log::warn;

use crate::dsp::{Envelope, EnvelopeStage, FilterKind, Waveform};
use crate::engine::{Bus, DeviceSession, Voice, VoiceId};
use crate::error::{MindclearError, Result};

/// Attack window in seconds
pub const ATTACK_SECS: f64 = 0.02;

/// Decay-to-sustain window in seconds
pub const DECAY_SECS: f64 = 0.1;

/// Sustain level relative to peak
pub const SUSTAIN_RATIO: f32 = 0.7;

/// Level the release decays to by the end of the tone
pub const RELEASE_FLOOR: f32 = 0.001;

/// Q of the tone-shaping low-pass
pub const TONE_FILTER_Q: f64 = 1.0;

/// One synthesis request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    /// Fundamental in Hz
    pub frequency: f64,
    /// Length in seconds
    pub duration: f64,
    pub waveform: Waveform,
    /// Peak gain in `[0, 1]`
    pub peak_volume: f32,
}

impl ToneSpec {
    pub fn new(frequency: f64, duration: f64, waveform: Waveform, peak_volume: f32) -> Self {
        Self {
            frequency,
            duration,
            waveform,
            peak_volume,
        }
    }

    pub fn sine(frequency: f64, duration: f64, peak_volume: f32) -> Self {
        Self::new(frequency, duration, Waveform::Sine, peak_volume)
    }

    /// Same tone at a different peak
    pub fn with_peak(self, peak_volume: f32) -> Self {
        Self {
            peak_volume,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(MindclearError::InvalidConfig {
                reason: format!("tone frequency must be > 0 Hz, got {}", self.frequency),
            });
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(MindclearError::InvalidConfig {
                reason: format!("tone duration must be > 0 s, got {}", self.duration),
            });
        }
        if !(0.0..=1.0).contains(&self.peak_volume) {
            return Err(MindclearError::InvalidConfig {
                reason: format!("tone peak must be in [0, 1], got {}", self.peak_volume),
            });
        }
        Ok(())
    }

    /// The one-shot gain envelope for this tone
    pub fn envelope(&self) -> Envelope {
        let peak = self.peak_volume;
        let sustain = peak * SUSTAIN_RATIO;
        Envelope::starting_at(0.0)
            .then(EnvelopeStage::set(0.0, 0.0))
            .then(EnvelopeStage::linear(ATTACK_SECS, peak))
            .then(EnvelopeStage::linear(ATTACK_SECS + DECAY_SECS, sustain))
            .then(EnvelopeStage::set(ATTACK_SECS + DECAY_SECS, sustain))
            .then(EnvelopeStage::exponential(self.duration, RELEASE_FLOOR))
    }
}

/// A falling oscillator sweep through a low-pass that falls with it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSpec {
    pub waveform: Waveform,
    pub from_hz: f32,
    pub to_hz: f32,
    pub cutoff_from: f32,
    pub cutoff_to: f32,
    pub filter_q: f64,
    pub duration: f64,
    pub peak_volume: f32,
}

impl SweepSpec {
    /// Gain starts at peak and decays exponentially to near-silence
    pub fn envelope(&self) -> Envelope {
        Envelope::exponential_sweep(self.peak_volume, RELEASE_FLOOR, self.duration)
    }
}

/// Builds tone voices; holds no state of its own
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneSynthesizer;

impl ToneSynthesizer {
    /// Oscillator -> low-pass chain with the given gain envelope
    fn chain(frequency: f64, waveform: Waveform, gain: Envelope) -> Voice {
        Voice::oscillator(waveform, Envelope::constant(frequency as f32))
            .with_filter(
                FilterKind::LowPass,
                TONE_FILTER_Q,
                Envelope::constant((frequency * 2.0) as f32),
            )
            .with_gain(gain)
    }

    /// A one-shot tone voice starting at absolute device time `start`
    pub fn voice(spec: &ToneSpec, start: f64) -> Voice {
        Self::chain(spec.frequency, spec.waveform, spec.envelope())
            .on_bus(Bus::Effects)
            .starting_at(start)
            .stopping_at(start + spec.duration)
    }

    /// A frequency sweep voice starting at absolute device time `start`
    pub fn sweep_voice(spec: &SweepSpec, start: f64) -> Voice {
        Voice::oscillator(
            spec.waveform,
            Envelope::exponential_sweep(spec.from_hz, spec.to_hz, spec.duration),
        )
        .with_filter(
            FilterKind::LowPass,
            spec.filter_q,
            Envelope::exponential_sweep(spec.cutoff_from, spec.cutoff_to, spec.duration),
        )
        .with_gain(spec.envelope())
        .on_bus(Bus::Effects)
        .starting_at(start)
        .stopping_at(start + spec.duration)
    }

    /// A continuous tone that fades in to `level` over `fade_in` seconds
    pub fn sustained_voice(
        frequency: f64,
        waveform: Waveform,
        level: f32,
        fade_in: f64,
        start: f64,
    ) -> Voice {
        let gain = Envelope::starting_at(0.0)
            .then(EnvelopeStage::set(0.0, 0.0))
            .then(EnvelopeStage::linear(fade_in, level));
        Self::chain(frequency, waveform, gain).starting_at(start)
    }

    /// Play a tone now
    pub fn play(device: &mut DeviceSession, spec: ToneSpec) -> Option<VoiceId> {
        Self::play_after(device, spec, 0.0)
    }

    /// Play a tone `delay` seconds from now
    ///
    /// The tone plays to completion; invalid specs are dropped with a warning.
    pub fn play_after(device: &mut DeviceSession, spec: ToneSpec, delay: f64) -> Option<VoiceId> {
        if let Err(e) = spec.validate() {
            warn!("Dropping tone: {}", e);
            return None;
        }
        let start = device.now() + delay.max(0.0);
        device.schedule(Self::voice(&spec, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::engine::{OfflineBackend, Source};
    use approx::assert_relative_eq;

    #[test]
    fn test_envelope_shape() {
        let spec = ToneSpec::sine(523.25, 0.2, 0.12);
        let env = spec.envelope();

        assert_eq!(env.value_at(0.0), 0.0);
        assert_relative_eq!(env.value_at(ATTACK_SECS), 0.12, epsilon = 1e-6);
        assert_relative_eq!(env.value_at(ATTACK_SECS + DECAY_SECS), 0.12 * 0.7, epsilon = 1e-6);
        assert_relative_eq!(env.value_at(0.2), RELEASE_FLOOR, epsilon = 1e-6);
        assert_relative_eq!(env.peak(), 0.12, epsilon = 1e-6);
    }

    #[test]
    fn test_short_tone_releases_before_sustain() {
        // 40 ms: the release begins straight after the attack
        let spec = ToneSpec::new(420.0, 0.04, Waveform::Square, 0.08);
        let env = spec.envelope();
        let mid = env.value_at(0.03);
        assert!(mid < 0.08 && mid > RELEASE_FLOOR);
    }

    #[test]
    fn test_validate() {
        assert!(ToneSpec::sine(440.0, 0.1, 0.1).validate().is_ok());
        assert!(ToneSpec::sine(0.0, 0.1, 0.1).validate().is_err());
        assert!(ToneSpec::sine(440.0, -1.0, 0.1).validate().is_err());
        assert!(ToneSpec::sine(440.0, 0.1, 1.5).validate().is_err());
    }

    #[test]
    fn test_voice_timing_and_filter() {
        let spec = ToneSpec::sine(800.0, 0.15, 0.1);
        let voice = ToneSynthesizer::voice(&spec, 2.0);
        assert_eq!(voice.start(), 2.0);
        assert_eq!(voice.stop(), Some(2.15));
        assert_eq!(voice.bus(), Bus::Effects);
        assert_eq!(voice.filter_kind(), Some(FilterKind::LowPass));
    }

    #[test]
    fn test_sweep_voice_falls() {
        let spec = SweepSpec {
            waveform: Waveform::Sawtooth,
            from_hz: 1200.0,
            to_hz: 80.0,
            cutoff_from: 1500.0,
            cutoff_to: 100.0,
            filter_q: 5.0,
            duration: 0.6,
            peak_volume: 0.15,
        };
        let voice = ToneSynthesizer::sweep_voice(&spec, 1.0);
        assert_eq!(voice.stop(), Some(1.6));
        let Source::Oscillator { frequency, .. } = voice.source() else {
            panic!("sweep must be an oscillator voice");
        };
        assert_relative_eq!(frequency.value_at(0.0), 1200.0);
        assert_relative_eq!(frequency.value_at(0.6), 80.0);
        assert!(frequency.value_at(0.3) < 1200.0 && frequency.value_at(0.3) > 80.0);
        assert_relative_eq!(voice.gain().value_at(0.0), 0.15);
    }

    #[test]
    fn test_concurrent_tones_are_independent() {
        let backend = OfflineBackend::new(48000);
        let handle = backend.handle();
        let mut device = DeviceSession::with_backend(AudioConfig::default(), Box::new(backend));
        device.resume();

        let a = ToneSynthesizer::play(&mut device, ToneSpec::sine(440.0, 0.1, 0.1));
        let b = ToneSynthesizer::play_after(&mut device, ToneSpec::sine(660.0, 0.3, 0.1), 0.05);
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);

        handle.render(48 * 20);
        assert_eq!(device.active_voices(), 2);
        handle.render(48 * 100);
        assert_eq!(device.active_voices(), 1);
        handle.render(48 * 300);
        assert_eq!(device.active_voices(), 0);
    }

    #[test]
    fn test_invalid_tone_is_dropped() {
        let backend = OfflineBackend::new(48000);
        let mut device = DeviceSession::with_backend(AudioConfig::default(), Box::new(backend));
        assert!(ToneSynthesizer::play(&mut device, ToneSpec::sine(-5.0, 0.1, 0.1)).is_none());
        assert_eq!(device.voices_scheduled(), 0);
    }
}
