//! Background music
//!
//! Procedural ambient sessions, pre-recorded track playback, and the
//! coordinator choosing between them.

pub mod ambient;
pub mod media;
pub mod track;

pub use ambient::{AmbientEngine, AmbientKind, Layer};
pub use media::{MediaPlayer, WavMediaPlayer};
pub use track::{MusicStatus, TrackCoordinator, TrackKey, TrackSelection, TrackSource};
