//! Periodic oscillators for the four tone waveforms.
//!
//! Sawtooth and square use a polynomial band-limited step correction at
//! their discontinuities so high sweeps (the whoosh cue starts at 1200 Hz)
//! don't alias audibly.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MindclearError;

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Sine => write!(f, "sine"),
            Waveform::Square => write!(f, "square"),
            Waveform::Sawtooth => write!(f, "sawtooth"),
            Waveform::Triangle => write!(f, "triangle"),
        }
    }
}

impl FromStr for Waveform {
    type Err = MindclearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(MindclearError::InvalidConfig {
                reason: format!("unknown waveform '{}'", other),
            }),
        }
    }
}

/// Two-sided polynomial band-limited step residual
#[inline]
fn poly_blep(phase: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return 0.0;
    }
    if phase < increment {
        let t = phase / increment;
        t + t - t * t - 1.0
    } else if phase > 1.0 - increment {
        let t = (phase - 1.0) / increment;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// Phase-accumulating oscillator; frequency is supplied per sample so it can
/// be swept or modulated by the caller.
#[derive(Debug, Clone, Default)]
pub struct Oscillator {
    waveform: Waveform,
    /// Normalized phase in `[0, 1)`
    phase: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Produce one sample at `frequency` Hz and advance the phase
    pub fn next_sample(&mut self, frequency: f64, sample_rate: f64) -> f32 {
        let increment = (frequency / sample_rate).clamp(0.0, 0.5);
        let phase = self.phase;

        let value = match self.waveform {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Sawtooth => {
                let naive = 2.0 * phase - 1.0;
                naive - poly_blep(phase, increment)
            }
            Waveform::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                let falling = (phase + 0.5).fract();
                naive + poly_blep(phase, increment) - poly_blep(falling, increment)
            }
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        };

        self.phase += increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        value as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn render(waveform: Waveform, frequency: f64, samples: usize) -> Vec<f32> {
        let mut osc = Oscillator::new(waveform);
        (0..samples)
            .map(|_| osc.next_sample(frequency, 48000.0))
            .collect()
    }

    #[test_case(Waveform::Sine)]
    #[test_case(Waveform::Square)]
    #[test_case(Waveform::Sawtooth)]
    #[test_case(Waveform::Triangle)]
    fn test_output_is_bounded(waveform: Waveform) {
        for s in render(waveform, 440.0, 4800) {
            assert!(s.abs() <= 1.01, "{} produced {}", waveform, s);
        }
    }

    #[test_case(Waveform::Sine)]
    #[test_case(Waveform::Square)]
    #[test_case(Waveform::Sawtooth)]
    #[test_case(Waveform::Triangle)]
    fn test_output_is_roughly_zero_mean(waveform: Waveform) {
        // 100 Hz at 48 kHz: 480 samples per cycle, 10 whole cycles
        let samples = render(waveform, 100.0, 4800);
        let mean: f32 = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.02, "{} mean {}", waveform, mean);
    }

    #[test]
    fn test_sine_zero_crossings_match_frequency() {
        let samples = render(Waveform::Sine, 440.0, 48000);
        let crossings = samples
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        assert!((439..=441).contains(&crossings), "got {}", crossings);
    }

    #[test]
    fn test_parse_waveform() {
        assert_eq!("SAW".parse::<Waveform>().unwrap(), Waveform::Sawtooth);
        assert_eq!("triangle".parse::<Waveform>().unwrap(), Waveform::Triangle);
        assert!("pulse".parse::<Waveform>().is_err());
    }
}
