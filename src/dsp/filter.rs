//! Biquad filters for tone shaping and noise coloring.
//!
//! Coefficients follow the Audio EQ Cookbook. The band-pass variant is the
//! constant 0 dB peak gain form, so sweeping its center doesn't change the
//! level of the passband.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    LowPass,
    BandPass,
}

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn calculate(kind: FilterKind, sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Keep the corner below Nyquist and away from DC
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 30.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::BandPass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha),
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Single-channel biquad whose cutoff may change every sample
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    q: f64,
    coeffs: BiquadCoeffs,
    cutoff: f64,
    sample_rate: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(kind: FilterKind, q: f64) -> Self {
        Self {
            kind,
            q,
            coeffs: BiquadCoeffs::default(),
            cutoff: 0.0,
            sample_rate: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Filter one sample with the cutoff/center at `cutoff` Hz
    pub fn process(&mut self, input: f32, cutoff: f64, sample_rate: f64) -> f32 {
        // Recompute only on a meaningful change; sweeps move a little each sample
        if sample_rate != self.sample_rate || (cutoff - self.cutoff).abs() > self.cutoff * 1e-4 {
            self.coeffs = BiquadCoeffs::calculate(self.kind, sample_rate, cutoff, self.q);
            self.cutoff = cutoff;
            self.sample_rate = sample_rate;
        }

        let c = &self.coeffs;
        let x = input as f64;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y as f32
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, Waveform};

    const SR: f64 = 48000.0;

    fn rms_through(kind: FilterKind, cutoff: f64, q: f64, tone: f64) -> f32 {
        let mut filter = Biquad::new(kind, q);
        let mut osc = Oscillator::new(Waveform::Sine);
        let samples: Vec<f32> = (0..48000)
            .map(|_| filter.process(osc.next_sample(tone, SR), cutoff, SR))
            .skip(4800)
            .collect();
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_lowpass_passes_low_and_cuts_high() {
        let low = rms_through(FilterKind::LowPass, 800.0, 0.707, 100.0);
        let high = rms_through(FilterKind::LowPass, 800.0, 0.707, 8000.0);
        assert!(low > 0.6, "passband rms {}", low);
        assert!(high < 0.05, "stopband rms {}", high);
    }

    #[test]
    fn test_bandpass_peaks_at_center() {
        let center = rms_through(FilterKind::BandPass, 1000.0, 2.0, 1000.0);
        let off = rms_through(FilterKind::BandPass, 1000.0, 2.0, 8000.0);
        assert!(center > 0.6, "center rms {}", center);
        assert!(off < center / 4.0, "off-center rms {}", off);
    }

    #[test]
    fn test_extreme_cutoff_stays_finite() {
        let mut filter = Biquad::new(FilterKind::LowPass, 1.0);
        for i in 0..1000 {
            let out = filter.process(if i % 2 == 0 { 1.0 } else { -1.0 }, 1.0e6, SR);
            assert!(out.is_finite());
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = Biquad::new(FilterKind::LowPass, 1.0);
        filter.process(1.0, 500.0, SR);
        filter.reset();
        let out = filter.process(0.0, 500.0, SR);
        assert_eq!(out, 0.0);
    }
}
