//! Process-scoped sound context
//!
//! [`SoundSystem`] is the one object the UI holds. It owns the device
//! session, the music coordinator and the cue library, and exposes the
//! operations the journal calls into. Nothing here returns an error: every
//! failure has already been logged and degraded to silence or fallback by
//! the time a call returns.
//!
//! Calls that start sound also resume the device, so they should be made
//! from user-initiated events.

use std::time::Instant;

use log::{debug, info};

use crate::config::AudioConfig;
use crate::cues::{Cue, CueLibrary, Emotion};
use crate::engine::{AudioBackend, DeviceSession};
use crate::music::{MusicStatus, TrackCoordinator, TrackKey};
use crate::rng::Rng;

/// Owns every piece of the audio engine
#[derive(Debug)]
pub struct SoundSystem {
    device: DeviceSession,
    music: TrackCoordinator,
    cues: CueLibrary,
    shut_down: bool,
}

impl SoundSystem {
    /// Sound system on the default output backend
    pub fn new(config: AudioConfig) -> Self {
        let cues = CueLibrary::new(&config);
        let music = TrackCoordinator::default().with_volume(config.music_volume);
        Self::from_parts(DeviceSession::new(config), music, cues)
    }

    /// Sound system on `backend`, with randomness seeded from `seed`
    pub fn with_backend(config: AudioConfig, backend: Box<dyn AudioBackend>, seed: u128) -> Self {
        let mut rng = Rng::new_with_seed(seed);
        let cues = CueLibrary::with_rng(&config, rng.fork());
        let music = TrackCoordinator::with_rng(rng).with_volume(config.music_volume);
        Self::from_parts(DeviceSession::with_backend(config, backend), music, cues)
    }

    pub fn from_parts(device: DeviceSession, music: TrackCoordinator, cues: CueLibrary) -> Self {
        Self {
            device,
            music,
            cues,
            shut_down: false,
        }
    }

    // ========================================================================
    // Background music
    // ========================================================================

    /// Load `track` and play it
    ///
    /// A track that is already playing is left alone. Otherwise the asset is
    /// probed again, so a file that fell back to synthesis gets another try.
    /// Returns whether music is playing afterwards.
    pub fn play_background_music(&mut self, track: &str) -> bool {
        self.device.resume();
        let key = TrackKey::resolve(track);
        let already_playing =
            self.music.is_playing() && self.music.selection().map(|s| s.key) == Some(key);
        if !already_playing {
            self.music.load_track(&mut self.device, key.as_str());
        }
        self.music.play(&mut self.device)
    }

    pub fn pause_background_music(&mut self) {
        self.music.pause(&mut self.device);
    }

    /// Toggle music, loading `track` first if nothing is selected yet
    pub fn toggle_background_music(&mut self, track: &str) -> bool {
        self.device.resume();
        if self.music.selection().is_none() {
            self.music.load_track(&mut self.device, track);
        }
        self.music.toggle(&mut self.device)
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.music.set_volume(&mut self.device, volume);
    }

    pub fn get_music_status(&self) -> MusicStatus {
        self.music.status()
    }

    /// Stop the current music and start `track`
    pub fn change_track(&mut self, track: &str) -> bool {
        self.device.resume();
        self.music.change_track(&mut self.device, track)
    }

    /// Stop and rewind the current music
    pub fn stop_music(&mut self) {
        self.music.stop(&mut self.device);
    }

    // ========================================================================
    // Cues
    // ========================================================================

    /// Fire any cue; returns the number of voices it scheduled
    pub fn play_cue(&mut self, cue: Cue) -> usize {
        self.device.resume();
        let music_playing = self.music.is_playing();
        self.cues.play(&mut self.device, cue, music_playing)
    }

    pub fn play_click(&mut self) {
        self.play_cue(Cue::Click);
    }

    pub fn play_success(&mut self) {
        self.play_cue(Cue::Success);
    }

    pub fn play_whoosh(&mut self) {
        self.play_cue(Cue::Whoosh);
    }

    pub fn play_burn(&mut self) {
        self.play_cue(Cue::Burn);
    }

    pub fn play_notification(&mut self) {
        self.play_cue(Cue::Notification);
    }

    /// Motif for `emotion` (English or Indonesian name); unknown names are silent
    pub fn play_emotional_tone(&mut self, emotion: &str) {
        match emotion.parse::<Emotion>() {
            Ok(emotion) => {
                self.play_cue(Cue::Emotion(emotion));
            }
            Err(e) => debug!("No tone for emotion: {}", e),
        }
    }

    /// Unthrottled typing tick
    pub fn play_type(&mut self) {
        self.play_cue(Cue::Type);
    }

    /// Typing tick limited to one per configured interval
    pub fn play_type_throttled(&mut self) -> bool {
        self.play_type_throttled_at(Instant::now())
    }

    /// [`SoundSystem::play_type_throttled`] with an explicit trigger time
    pub fn play_type_throttled_at(&mut self, now: Instant) -> bool {
        self.device.resume();
        let music_playing = self.music.is_playing();
        self.cues
            .play_type_throttled(&mut self.device, music_playing, now)
    }

    /// Flip cues on or off; returns whether they are now enabled
    pub fn toggle_sounds(&mut self) -> bool {
        self.cues.toggle()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop music and suspend output
    ///
    /// Also runs on drop; calling it more than once is harmless.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.music.stop(&mut self.device);
        self.device.suspend();
        self.shut_down = true;
        info!("Sound system shut down");
    }

    pub fn device(&self) -> &DeviceSession {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceSession {
        &mut self.device
    }

    pub fn music(&self) -> &TrackCoordinator {
        &self.music
    }

    pub fn cues(&self) -> &CueLibrary {
        &self.cues
    }
}

impl Drop for SoundSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
