//! Scheduled parameter automation
//!
//! An [`Envelope`] is an ordered list of [`EnvelopeStage`]s, each of which
//! reaches a target value at a time offset (seconds, relative to the owning
//! voice's start). The curve of a stage describes how the value travels from
//! the previous stage's target to this one:
//!
//! - `Set`: hold the previous value, jump at the stage time
//! - `Linear`: straight line
//! - `Exponential`: constant ratio per unit time (values clamped to a small
//!   positive floor so a ramp "to zero" still terminates)
//!
//! The same type drives gain envelopes, oscillator frequency sweeps and
//! filter cutoff sweeps.

/// Smallest magnitude an exponential ramp will travel to or from
pub const EXPONENTIAL_FLOOR: f32 = 1.0e-4;

/// How a stage approaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Set,
    Linear,
    Exponential,
}

/// One automation point: reach `target` at `time` via `curve`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeStage {
    pub time: f64,
    pub target: f32,
    pub curve: Curve,
}

impl EnvelopeStage {
    pub fn set(time: f64, target: f32) -> Self {
        Self {
            time,
            target,
            curve: Curve::Set,
        }
    }

    pub fn linear(time: f64, target: f32) -> Self {
        Self {
            time,
            target,
            curve: Curve::Linear,
        }
    }

    pub fn exponential(time: f64, target: f32) -> Self {
        Self {
            time,
            target,
            curve: Curve::Exponential,
        }
    }
}

/// Time-varying value built from stages kept in time order
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    initial: f32,
    stages: Vec<EnvelopeStage>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl Envelope {
    /// A value that never changes
    pub fn constant(value: f32) -> Self {
        Self {
            initial: value,
            stages: Vec::new(),
        }
    }

    /// Start from `initial` and add stages with [`Envelope::then`]
    pub fn starting_at(initial: f32) -> Self {
        Self::constant(initial)
    }

    /// Add a stage, keeping stages sorted by time
    ///
    /// Stages with equal times keep insertion order.
    pub fn then(mut self, stage: EnvelopeStage) -> Self {
        let index = self.stages.partition_point(|s| s.time <= stage.time);
        self.stages.insert(index, stage);
        self
    }

    /// Exponential sweep from `from` to `to` over `duration` seconds
    pub fn exponential_sweep(from: f32, to: f32, duration: f64) -> Self {
        Self::starting_at(from)
            .then(EnvelopeStage::set(0.0, from))
            .then(EnvelopeStage::exponential(duration, to))
    }

    pub fn stages(&self) -> &[EnvelopeStage] {
        &self.stages
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    /// Largest value the envelope ever reaches
    pub fn peak(&self) -> f32 {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.initial, f32::max)
    }

    /// Time of the final stage (zero for a constant)
    pub fn end_time(&self) -> f64 {
        self.stages.last().map(|s| s.time).unwrap_or(0.0)
    }

    /// Multiply every value by `factor`
    pub fn scaled(mut self, factor: f32) -> Self {
        self.initial *= factor;
        for stage in &mut self.stages {
            stage.target *= factor;
        }
        self
    }

    /// Evaluate the envelope `t` seconds after its origin
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for stage in &self.stages {
            if t >= stage.time {
                prev_time = stage.time;
                prev_value = stage.target;
                continue;
            }

            let span = stage.time - prev_time;
            let frac = if span > 0.0 {
                ((t - prev_time) / span).clamp(0.0, 1.0) as f32
            } else {
                1.0
            };

            return match stage.curve {
                Curve::Set => prev_value,
                Curve::Linear => prev_value + (stage.target - prev_value) * frac,
                Curve::Exponential => {
                    let from = prev_value.max(EXPONENTIAL_FLOOR);
                    let to = stage.target.max(EXPONENTIAL_FLOOR);
                    from * (to / from).powf(frac)
                }
            };
        }

        prev_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant() {
        let env = Envelope::constant(0.5);
        assert_eq!(env.value_at(0.0), 0.5);
        assert_eq!(env.value_at(100.0), 0.5);
        assert_eq!(env.end_time(), 0.0);
    }

    #[test]
    fn test_linear_ramp_midpoint() {
        let env = Envelope::starting_at(0.0)
            .then(EnvelopeStage::set(0.0, 0.0))
            .then(EnvelopeStage::linear(2.0, 0.02));
        assert_relative_eq!(env.value_at(1.0), 0.01, epsilon = 1e-6);
        assert_relative_eq!(env.value_at(2.0), 0.02, epsilon = 1e-6);
        assert_relative_eq!(env.value_at(5.0), 0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_exponential_sweep_is_geometric() {
        let env = Envelope::exponential_sweep(1500.0, 200.0, 1.5);
        assert_relative_eq!(env.value_at(0.0), 1500.0, epsilon = 1e-3);
        let expected_mid = 1500.0_f32 * (200.0_f32 / 1500.0).powf(0.5);
        assert_relative_eq!(env.value_at(0.75), expected_mid, max_relative = 1e-4);
        assert_relative_eq!(env.value_at(1.5), 200.0, epsilon = 1e-3);
    }

    #[test]
    fn test_exponential_from_zero_uses_floor() {
        let env = Envelope::starting_at(0.0).then(EnvelopeStage::exponential(1.0, 1.0));
        let v = env.value_at(0.5);
        assert!(v > 0.0 && v < 1.0);
    }

    #[test]
    fn test_set_holds_until_stage_time() {
        let env = Envelope::starting_at(0.2).then(EnvelopeStage::set(1.0, 0.8));
        assert_eq!(env.value_at(0.99), 0.2);
        assert_eq!(env.value_at(1.0), 0.8);
    }

    #[test]
    fn test_stages_stay_sorted() {
        let env = Envelope::starting_at(0.0)
            .then(EnvelopeStage::linear(0.12, 0.07))
            .then(EnvelopeStage::exponential(0.04, 0.001))
            .then(EnvelopeStage::linear(0.02, 0.1));
        let times: Vec<f64> = env.stages().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.02, 0.04, 0.12]);
    }

    #[test]
    fn test_scaled_and_peak() {
        let env = Envelope::starting_at(0.0)
            .then(EnvelopeStage::linear(0.02, 0.1))
            .then(EnvelopeStage::linear(0.12, 0.07))
            .scaled(0.7);
        assert_relative_eq!(env.peak(), 0.07, epsilon = 1e-6);
    }
}
