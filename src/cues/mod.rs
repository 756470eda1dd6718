//! Reactive UI sound cues

pub mod library;
pub mod throttle;

pub use library::{Cue, CueLibrary, Emotion, SoundEvent, TYPE_FREQUENCIES};
pub use throttle::TypingThrottle;
