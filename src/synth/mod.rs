//! Sound sources built on top of the engine's voices
//!
//! - [`ToneSynthesizer`]: enveloped, filtered oscillator tones
//! - [`NoiseSynthesizer`]: pink noise and crackle buffers

pub mod noise;
pub mod tone;

pub use noise::NoiseSynthesizer;
pub use tone::{ToneSpec, ToneSynthesizer};
