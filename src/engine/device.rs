//! Device session
//!
//! One [`DeviceSession`] owns the processing context: the backend, the
//! command channel into the renderer and the master volume every bus feeds.
//! It is created lazily on first use. If no device can be opened the session
//! goes permanently [`SessionState::Disabled`] and every operation becomes a
//! silent no-op.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use log::{debug, info, warn};

use crate::config::{clamp_unit, AudioConfig};
use crate::engine::backend::{default_backend, AudioBackend, BackendFactory};
use crate::engine::renderer::{RenderCommand, Renderer, SharedState};
use crate::engine::voice::{Bus, Voice, VoiceId};

/// Lifecycle of the processing context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing has asked for sound yet
    #[default]
    Uninitialized,
    /// Context exists but its clock is frozen until a user gesture resumes it
    Suspended,
    /// Rendering
    Running,
    /// No device; permanent silent mode
    Disabled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "Uninitialized"),
            SessionState::Suspended => write!(f, "Suspended"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Disabled => write!(f, "Disabled"),
        }
    }
}

struct Live {
    backend: Box<dyn AudioBackend>,
    shared: Arc<SharedState>,
    commands: Sender<RenderCommand>,
}

/// The single shared processing context
pub struct DeviceSession {
    state: SessionState,
    factory: Option<BackendFactory>,
    config: AudioConfig,
    live: Option<Live>,
    master_volume: f32,
    bus_gains: [f32; 3],
    next_voice_id: VoiceId,
    voices_scheduled: u64,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("master_volume", &self.master_volume)
            .field("voices_scheduled", &self.voices_scheduled)
            .finish()
    }
}

impl DeviceSession {
    /// Session that opens the default backend on first use
    pub fn new(config: AudioConfig) -> Self {
        Self::with_factory(config, Box::new(default_backend))
    }

    /// Session that opens `backend` on first use
    pub fn with_backend(config: AudioConfig, backend: Box<dyn AudioBackend>) -> Self {
        Self::with_factory(config, Box::new(move |_: &AudioConfig| Ok(backend)))
    }

    pub fn with_factory(config: AudioConfig, factory: BackendFactory) -> Self {
        let mut bus_gains = [1.0; 3];
        bus_gains[Bus::Ambient.index()] = clamp_unit(config.ambient_scale * config.music_volume);
        bus_gains[Bus::Media.index()] = clamp_unit(config.music_volume);
        bus_gains[Bus::Effects.index()] = clamp_unit(config.effects_gain);

        Self {
            state: SessionState::Uninitialized,
            factory: Some(factory),
            master_volume: clamp_unit(config.master_volume),
            config,
            live: None,
            bus_gains,
            next_voice_id: 1,
            voices_scheduled: 0,
        }
    }

    /// Create the context on first call
    ///
    /// Returns `false` when the session is disabled. Failures never
    /// propagate: they are logged once and the session stays silent.
    pub fn ensure_ready(&mut self) -> bool {
        if self.state != SessionState::Uninitialized {
            return self.state != SessionState::Disabled;
        }

        let Some(factory) = self.factory.take() else {
            self.state = SessionState::Disabled;
            return false;
        };

        let mut backend = match factory(&self.config) {
            Ok(backend) => backend,
            Err(e) => {
                warn!("Audio not supported, running silently: {}", e);
                self.state = SessionState::Disabled;
                return false;
            }
        };

        let running = !self.config.start_suspended;
        let shared = Arc::new(SharedState::new(
            backend.sample_rate(),
            self.master_volume,
            running,
        ));
        let (tx, rx) = unbounded();
        let renderer = Renderer::new(Arc::clone(&shared), rx, self.bus_gains);

        if let Err(e) = backend.open(renderer) {
            warn!("Audio not supported, running silently: {}", e);
            self.state = SessionState::Disabled;
            return false;
        }

        info!(
            "Audio session ready on {} backend at {} Hz",
            backend.name(),
            backend.sample_rate()
        );
        self.state = if running {
            SessionState::Running
        } else {
            SessionState::Suspended
        };
        self.live = Some(Live {
            backend,
            shared,
            commands: tx,
        });
        true
    }

    /// Leave the suspended state; call from a user-initiated event
    pub fn resume(&mut self) {
        if !self.ensure_ready() || self.state != SessionState::Suspended {
            return;
        }
        if let Some(live) = self.live.as_mut() {
            if let Err(e) = live.backend.set_active(true) {
                warn!("Failed to resume audio stream: {}", e);
                return;
            }
            live.shared.set_running(true);
            self.state = SessionState::Running;
            debug!("Audio session resumed");
        }
    }

    /// Freeze the clock and silence output
    pub fn suspend(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        if let Some(live) = self.live.as_mut() {
            live.shared.set_running(false);
            if let Err(e) = live.backend.set_active(false) {
                warn!("Failed to pause audio stream: {}", e);
            }
            self.state = SessionState::Suspended;
            debug!("Audio session suspended");
        }
    }

    /// Set the master volume, clamped to `[0, 1]`
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = clamp_unit(volume);
        if let Some(live) = self.live.as_ref() {
            live.shared.set_master_gain(self.master_volume);
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set one bus level, clamped to `[0, 1]`
    pub fn set_bus_gain(&mut self, bus: Bus, gain: f32) {
        let gain = clamp_unit(gain);
        self.bus_gains[bus.index()] = gain;
        self.send(RenderCommand::SetBusGain { bus, gain });
    }

    pub fn bus_gain(&self, bus: Bus) -> f32 {
        self.bus_gains[bus.index()]
    }

    /// Hand a voice to the renderer
    ///
    /// Ownership moves to the audio thread; the returned id can end it early.
    /// `None` when the session is disabled.
    pub fn schedule(&mut self, mut voice: Voice) -> Option<VoiceId> {
        if !self.ensure_ready() {
            return None;
        }
        let id = self.next_voice_id;
        self.next_voice_id += 1;
        voice.assign_id(id);

        if self.send(RenderCommand::Spawn(Box::new(voice))) {
            self.voices_scheduled += 1;
            Some(id)
        } else {
            None
        }
    }

    /// End a voice now
    pub fn stop_voice(&mut self, id: VoiceId) {
        let at = self.now();
        self.stop_voice_at(id, at);
    }

    /// End a voice at absolute device time `at`
    pub fn stop_voice_at(&mut self, id: VoiceId, at: f64) {
        self.send(RenderCommand::Stop { id, at });
    }

    fn send(&mut self, cmd: RenderCommand) -> bool {
        let Some(live) = self.live.as_ref() else {
            return false;
        };
        if live.commands.send(cmd).is_err() {
            warn!("Audio renderer went away; disabling session");
            self.live = None;
            self.state = SessionState::Disabled;
            return false;
        }
        true
    }

    /// Current device time in seconds
    pub fn now(&self) -> f64 {
        self.live.as_ref().map(|l| l.shared.now()).unwrap_or(0.0)
    }

    pub fn sample_rate(&self) -> u32 {
        self.live
            .as_ref()
            .map(|l| l.shared.sample_rate())
            .unwrap_or(self.config.sample_rate)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.state == SessionState::Disabled
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Total voices handed to the renderer since creation
    pub fn voices_scheduled(&self) -> u64 {
        self.voices_scheduled
    }

    /// Voices still alive after the renderer's last block
    pub fn active_voices(&self) -> usize {
        self.live
            .as_ref()
            .map(|l| l.shared.active_voices())
            .unwrap_or(0)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Envelope, Waveform};
    use crate::engine::backend::{NullBackend, OfflineBackend};
    use crate::error::MindclearError;

    fn offline(config: AudioConfig) -> (DeviceSession, crate::engine::OfflineHandle) {
        let backend = OfflineBackend::new(config.sample_rate);
        let handle = backend.handle();
        (DeviceSession::with_backend(config, Box::new(backend)), handle)
    }

    #[test]
    fn test_lazy_initialization() {
        let (mut session, handle) = offline(AudioConfig::default());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(!handle.is_open());

        assert!(session.ensure_ready());
        assert_eq!(session.state(), SessionState::Suspended);
        assert!(handle.is_open());
    }

    #[test]
    fn test_start_running_when_configured() {
        let config = AudioConfig {
            start_suspended: false,
            ..AudioConfig::default()
        };
        let (mut session, _handle) = offline(config);
        session.ensure_ready();
        assert!(session.is_running());
    }

    #[test]
    fn test_missing_device_disables_permanently() {
        let mut session =
            DeviceSession::with_backend(AudioConfig::default(), Box::new(NullBackend::new(48000)));
        assert!(!session.ensure_ready());
        assert!(session.is_disabled());

        session.resume();
        assert!(session.is_disabled());
        let voice = Voice::oscillator(Waveform::Sine, Envelope::constant(440.0));
        assert_eq!(session.schedule(voice), None);
        assert_eq!(session.voices_scheduled(), 0);
    }

    #[test]
    fn test_failing_factory_disables() {
        let mut session = DeviceSession::with_factory(
            AudioConfig::default(),
            Box::new(|_: &AudioConfig| {
                Err(MindclearError::DeviceUnavailable {
                    reason: "test".to_string(),
                })
            }),
        );
        assert!(!session.ensure_ready());
        assert_eq!(session.state(), SessionState::Disabled);
    }

    #[test]
    fn test_resume_only_from_suspended() {
        let (mut session, _handle) = offline(AudioConfig::default());
        session.resume();
        assert!(session.is_running());
        session.resume();
        assert!(session.is_running());

        session.suspend();
        assert_eq!(session.state(), SessionState::Suspended);
    }

    #[test]
    fn test_master_volume_clamped() {
        let (mut session, _handle) = offline(AudioConfig::default());
        session.set_master_volume(1.7);
        assert_eq!(session.master_volume(), 1.0);
        session.set_master_volume(-0.2);
        assert_eq!(session.master_volume(), 0.0);
    }

    #[test]
    fn test_initial_bus_gains_clamped() {
        let config = AudioConfig {
            music_volume: 4.0,
            ambient_scale: 0.5,
            effects_gain: -1.0,
            ..AudioConfig::default()
        };
        let (session, _handle) = offline(config);
        assert_eq!(session.bus_gain(Bus::Media), 1.0);
        assert_eq!(session.bus_gain(Bus::Ambient), 1.0);
        assert_eq!(session.bus_gain(Bus::Effects), 0.0);
    }

    #[test]
    fn test_scheduled_voice_is_heard() {
        let (mut session, handle) = offline(AudioConfig::default());
        session.resume();
        let voice = Voice::oscillator(Waveform::Square, Envelope::constant(200.0))
            .starting_at(session.now())
            .stopping_at(session.now() + 0.05);
        assert!(session.schedule(voice).is_some());

        let out = handle.render(1000);
        assert!(out.iter().any(|s| s.abs() > 0.01));
        assert_eq!(session.active_voices(), 1);

        handle.render(4000);
        assert_eq!(session.active_voices(), 0);
    }

    #[test]
    fn test_no_output_while_suspended() {
        let (mut session, handle) = offline(AudioConfig::default());
        session.ensure_ready();
        let voice = Voice::oscillator(Waveform::Square, Envelope::constant(200.0)).stopping_at(1.0);
        session.schedule(voice);
        assert!(handle.render(480).iter().all(|&s| s == 0.0));
        assert_eq!(session.now(), 0.0);
    }
}
