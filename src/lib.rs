//! MindClear+ Audio - procedural sound for a mood journal
//!
//! Everything the journal hears is synthesized on the fly:
//! 1. Background music - a pre-recorded track when one is available, a
//!    generative ambient session (lofi chord or pink-noise nature bed) when
//!    it isn't
//! 2. UI cues - short enveloped tones and noise bursts for clicks, typing,
//!    success, burning a journal entry and the detected emotion
//!
//! # Architecture
//!
//! - `engine`: device session, voices, buses and the real-time renderer
//! - `synth`: tone and noise builders on top of voices
//! - `music`: ambient engine, media player, track coordinator
//! - `cues`: cue catalog, ducking and typing throttle
//! - `system`: [`SoundSystem`], the one object the UI talks to

pub mod cli;
pub mod config;
pub mod cues;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod music;
pub mod rng;
pub mod synth;
pub mod system;

pub use config::AudioConfig;
pub use error::{MindclearError, Result};
pub use system::SoundSystem;
