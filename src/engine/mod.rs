//! Audio Engine Module
//!
//! The processing context and everything it schedules:
//! - Voices: self-scheduling source -> filter -> gain chains
//! - Renderer: mixes voices into buses and the master volume on the audio thread
//! - Backends: live device, offline pull, or none
//! - DeviceSession: lazy, suspendable owner of all of the above
//! - WAV file I/O

pub mod backend;
pub mod device;
pub mod io;
pub mod renderer;
pub mod voice;

pub use backend::{default_backend, AudioBackend, BackendFactory, NullBackend, OfflineBackend, OfflineHandle};
pub use device::{DeviceSession, SessionState};
pub use io::{read_wav_mono, write_wav, ExportFormat};
pub use renderer::{RenderCommand, Renderer, SharedState};
pub use voice::{Bus, Lfo, Source, Voice, VoiceId};
