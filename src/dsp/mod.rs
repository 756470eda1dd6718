//! Sample-level building blocks
//!
//! Envelopes schedule parameter changes, oscillators and biquad filters turn
//! them into samples. Nothing in here knows about devices or buses.

pub mod envelope;
pub mod filter;
pub mod oscillator;

pub use envelope::{Curve, Envelope, EnvelopeStage, EXPONENTIAL_FLOOR};
pub use filter::{Biquad, FilterKind};
pub use oscillator::{Oscillator, Waveform};
