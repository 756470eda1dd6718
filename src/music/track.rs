//! Background music selection
//!
//! The [`TrackCoordinator`] decides, per track, whether the pre-recorded
//! asset or the procedural ambient engine plays. The asset is probed when
//! the track is loaded; if it can't be decoded the procedural kind for that
//! track is chosen right away. If the asset loads but refuses to play, the
//! coordinator switches the selection to procedural and tries once more.
//! None of this is reported to the caller: the worst case is silence.

use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::{clamp_unit, DEFAULT_MUSIC_VOLUME};
use crate::engine::DeviceSession;
use crate::music::ambient::{AmbientEngine, AmbientKind};
use crate::music::media::{MediaPlayer, WavMediaPlayer};
use crate::rng::Rng;

/// Named background tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKey {
    LofiCalm,
    NatureSounds,
    Ambient,
}

impl TrackKey {
    pub const ALL: [TrackKey; 3] = [TrackKey::LofiCalm, TrackKey::NatureSounds, TrackKey::Ambient];

    /// Key as it appears in the track table
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKey::LofiCalm => "LOFI_CALM",
            TrackKey::NatureSounds => "NATURE_SOUNDS",
            TrackKey::Ambient => "AMBIENT",
        }
    }

    /// Match a key or one of its mood aliases, ignoring case and separators
    pub fn lookup(name: &str) -> Option<TrackKey> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "LOFI_CALM" | "LOFI" | "CALM" => Some(TrackKey::LofiCalm),
            "NATURE_SOUNDS" | "NATURE" => Some(TrackKey::NatureSounds),
            "AMBIENT" => Some(TrackKey::Ambient),
            _ => None,
        }
    }

    /// Like [`TrackKey::lookup`], with unknown names treated as calm
    pub fn resolve(name: &str) -> TrackKey {
        TrackKey::lookup(name).unwrap_or_else(|| {
            debug!("Unknown track '{}', using {}", name, TrackKey::LofiCalm);
            TrackKey::LofiCalm
        })
    }

    /// The procedural composition standing in for this track
    pub fn ambient_kind(&self) -> AmbientKind {
        match self {
            TrackKey::LofiCalm | TrackKey::Ambient => AmbientKind::Lofi,
            TrackKey::NatureSounds => AmbientKind::Nature,
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the selected track's audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    File(PathBuf),
    Procedural(AmbientKind),
}

impl TrackSource {
    pub fn is_procedural(&self) -> bool {
        matches!(self, TrackSource::Procedural(_))
    }
}

/// The loaded track and how it is produced
///
/// Sticky until the next load or track change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelection {
    pub key: TrackKey,
    pub source: TrackSource,
}

impl TrackSelection {
    /// Name reported in [`MusicStatus::current_track`]
    pub fn display_name(&self) -> String {
        match &self.source {
            TrackSource::File(path) => path.display().to_string(),
            TrackSource::Procedural(_) => format!("procedural_{}", self.key),
        }
    }
}

/// Snapshot of the player for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct MusicStatus {
    pub is_playing: bool,
    pub current_track: Option<String>,
    pub volume: f32,
}

/// Owns play/pause/volume/track state for background music
#[derive(Debug)]
pub struct TrackCoordinator {
    selection: Option<TrackSelection>,
    playing: bool,
    volume: f32,
    media: Box<dyn MediaPlayer>,
    ambient: AmbientEngine,
}

impl Default for TrackCoordinator {
    fn default() -> Self {
        Self::new(Box::new(WavMediaPlayer::new()), AmbientEngine::default())
    }
}

impl TrackCoordinator {
    pub fn new(media: Box<dyn MediaPlayer>, ambient: AmbientEngine) -> Self {
        Self {
            selection: None,
            playing: false,
            volume: DEFAULT_MUSIC_VOLUME,
            media,
            ambient,
        }
    }

    /// WAV playback with a seeded ambient engine
    pub fn with_rng(rng: Rng) -> Self {
        Self::new(Box::new(WavMediaPlayer::new()), AmbientEngine::new(rng))
    }

    /// Start from `volume` instead of the default level
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp_unit(volume);
        self.ambient = self.ambient.with_volume(self.volume);
        self
    }

    /// Select `name`, probing its asset
    ///
    /// Anything already playing is stopped first. Returns the chosen source.
    pub fn load_track(&mut self, device: &mut DeviceSession, name: &str) -> TrackSource {
        let key = TrackKey::resolve(name);
        self.halt(device);

        let source = match device.config().track_path(key.as_str()) {
            Some(path) => match self.media.load(device, &path) {
                Ok(()) => {
                    self.media.set_volume(device, self.volume);
                    TrackSource::File(path)
                }
                Err(e) => {
                    warn!(
                        "Track {} unavailable ({}), using procedural {}",
                        key,
                        e,
                        key.ambient_kind()
                    );
                    TrackSource::Procedural(key.ambient_kind())
                }
            },
            None => {
                debug!("No asset configured for {}", key);
                TrackSource::Procedural(key.ambient_kind())
            }
        };

        self.selection = Some(TrackSelection {
            key,
            source: source.clone(),
        });
        source
    }

    /// Start the selected track, loading the calm track if none is selected
    ///
    /// Returns whether music is playing afterwards.
    pub fn play(&mut self, device: &mut DeviceSession) -> bool {
        if self.playing {
            return true;
        }
        let selection = match self.selection.clone() {
            Some(selection) => selection,
            None => {
                self.load_track(device, TrackKey::LofiCalm.as_str());
                match self.selection.clone() {
                    Some(selection) => selection,
                    None => return false,
                }
            }
        };

        match selection.source {
            TrackSource::Procedural(kind) => self.play_procedural(device, kind),
            TrackSource::File(path) => match self.media.play(device) {
                Ok(()) => {
                    info!("Playing {}", path.display());
                    self.playing = true;
                }
                Err(e) => {
                    let kind = selection.key.ambient_kind();
                    warn!(
                        "Playback of {} failed ({}), falling back to procedural {}",
                        path.display(),
                        e,
                        kind
                    );
                    self.selection = Some(TrackSelection {
                        key: selection.key,
                        source: TrackSource::Procedural(kind),
                    });
                    self.play_procedural(device, kind);
                }
            },
        }
        self.playing
    }

    fn play_procedural(&mut self, device: &mut DeviceSession, kind: AmbientKind) {
        self.ambient.set_volume(device, self.volume);
        self.ambient.start(device, kind);
        self.playing = self.ambient.is_playing();
    }

    /// Stop whatever is active; the selection stays and `play` resumes it
    pub fn pause(&mut self, device: &mut DeviceSession) {
        self.halt(device);
    }

    fn halt(&mut self, device: &mut DeviceSession) {
        self.media.pause(device);
        self.ambient.stop(device);
        if self.playing {
            debug!("Music paused");
        }
        self.playing = false;
    }

    /// Pause if playing, else play; returns the resulting playing flag
    pub fn toggle(&mut self, device: &mut DeviceSession) -> bool {
        if self.playing {
            self.pause(device);
            false
        } else {
            self.play(device)
        }
    }

    /// Stop the current source, then load and play `name`
    pub fn change_track(&mut self, device: &mut DeviceSession, name: &str) -> bool {
        self.stop(device);
        self.load_track(device, name);
        self.play(device)
    }

    /// Pause and rewind
    pub fn stop(&mut self, device: &mut DeviceSession) {
        self.halt(device);
        self.media.rewind();
    }

    /// Set the music level, clamped to `[0, 1]`
    ///
    /// Both sources follow the level; the procedural one is scaled down by
    /// the configured ambient scale.
    pub fn set_volume(&mut self, device: &mut DeviceSession, volume: f32) {
        self.volume = clamp_unit(volume);
        self.media.set_volume(device, self.volume);
        self.ambient.set_volume(device, self.volume);
    }

    pub fn status(&self) -> MusicStatus {
        MusicStatus {
            is_playing: self.playing,
            current_track: self.selection.as_ref().map(TrackSelection::display_name),
            volume: self.volume,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn selection(&self) -> Option<&TrackSelection> {
        self.selection.as_ref()
    }

    pub fn ambient(&self) -> &AmbientEngine {
        &self.ambient
    }

    pub fn media(&self) -> &dyn MediaPlayer {
        self.media.as_ref()
    }
}
