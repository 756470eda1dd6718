//! Pre-recorded track playback
//!
//! A [`MediaPlayer`] plays one loaded asset on the media bus. Playback of a
//! file is never guaranteed: the asset may be missing or undecodable, and
//! output may still be suspended waiting for a user gesture. Every such
//! failure is reported as a recoverable error so the caller can fall back to
//! procedural music.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::config::clamp_unit;
use crate::engine::{read_wav_mono, Bus, DeviceSession, Voice, VoiceId};
use crate::error::{MindclearError, Result};

/// Something that can play one pre-recorded asset
pub trait MediaPlayer: std::fmt::Debug {
    /// Decode `path`, replacing whatever was loaded
    fn load(&mut self, device: &mut DeviceSession, path: &Path) -> Result<()>;

    /// Start or resume playback from the current position
    fn play(&mut self, device: &mut DeviceSession) -> Result<()>;

    /// Stop playback, keeping the current position
    fn pause(&mut self, device: &mut DeviceSession);

    /// Move the position back to the start
    fn rewind(&mut self);

    /// Set the playback level, clamped to `[0, 1]`
    fn set_volume(&mut self, device: &mut DeviceSession, volume: f32);

    fn is_loaded(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Path of the loaded asset
    fn source(&self) -> Option<&Path>;
}

#[derive(Debug)]
struct Loaded {
    path: PathBuf,
    samples: Arc<[f32]>,
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    voice: VoiceId,
    /// Device time at which `position` was the read head
    started_at: f64,
}

/// Plays WAV assets as a looping buffer voice
#[derive(Debug)]
pub struct WavMediaPlayer {
    loaded: Option<Loaded>,
    playing: Option<Playing>,
    /// Read head in frames, updated on pause
    position: usize,
    volume: f32,
}

impl Default for WavMediaPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl WavMediaPlayer {
    pub fn new() -> Self {
        Self {
            loaded: None,
            playing: None,
            position: 0,
            volume: crate::config::DEFAULT_MUSIC_VOLUME,
        }
    }

    /// Read head in frames
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl MediaPlayer for WavMediaPlayer {
    fn load(&mut self, device: &mut DeviceSession, path: &Path) -> Result<()> {
        self.pause(device);
        self.loaded = None;
        self.position = 0;

        // The decoded rate has to match the renderer's
        device.ensure_ready();
        let samples = read_wav_mono(path, device.sample_rate())?;
        info!(
            "Loaded track {} ({:.1}s)",
            path.display(),
            samples.len() as f64 / device.sample_rate() as f64
        );
        self.loaded = Some(Loaded {
            path: path.to_path_buf(),
            samples: Arc::from(samples),
        });
        Ok(())
    }

    fn play(&mut self, device: &mut DeviceSession) -> Result<()> {
        if self.playing.is_some() {
            return Ok(());
        }
        let Some(loaded) = self.loaded.as_ref() else {
            return Err(MindclearError::NothingLoaded);
        };
        if !device.is_running() {
            return Err(MindclearError::PlaybackBlocked {
                reason: format!("audio output is {}", device.state()),
            });
        }

        let started_at = device.now();
        let voice = Voice::buffer_from(Arc::clone(&loaded.samples), true, self.position)
            .on_bus(Bus::Media)
            .starting_at(started_at);
        let voice = device
            .schedule(voice)
            .ok_or_else(|| MindclearError::PlaybackBlocked {
                reason: "audio output went away".to_string(),
            })?;

        debug!("Playing {} from frame {}", loaded.path.display(), self.position);
        self.playing = Some(Playing { voice, started_at });
        Ok(())
    }

    fn pause(&mut self, device: &mut DeviceSession) {
        let Some(playing) = self.playing.take() else {
            return;
        };
        device.stop_voice(playing.voice);

        if let Some(loaded) = self.loaded.as_ref() {
            let len = loaded.samples.len();
            let elapsed = (device.now() - playing.started_at).max(0.0);
            let frames = (elapsed * device.sample_rate() as f64).round() as usize;
            if len > 0 {
                self.position = (self.position + frames) % len;
            }
        }
    }

    fn rewind(&mut self) {
        self.position = 0;
    }

    fn set_volume(&mut self, device: &mut DeviceSession, volume: f32) {
        self.volume = clamp_unit(volume);
        device.set_bus_gain(Bus::Media, self.volume);
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    fn source(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::engine::{write_wav, ExportFormat, OfflineBackend, OfflineHandle};
    use tempfile::TempDir;

    fn device() -> (DeviceSession, OfflineHandle) {
        let backend = OfflineBackend::new(8000);
        let handle = backend.handle();
        let config = AudioConfig {
            sample_rate: 8000,
            ..AudioConfig::default()
        };
        (DeviceSession::with_backend(config, Box::new(backend)), handle)
    }

    fn track(dir: &TempDir, frames: usize) -> PathBuf {
        let path = dir.path().join("track.wav");
        let samples: Vec<f32> = (0..frames).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        write_wav(&path, &samples, ExportFormat::new(8000, 16)).unwrap();
        path
    }

    #[test]
    fn test_play_requires_loaded_asset() {
        let (mut device, _handle) = device();
        device.resume();
        let mut player = WavMediaPlayer::new();
        let err = player.play(&mut device).unwrap_err();
        assert!(matches!(err, MindclearError::NothingLoaded));
    }

    #[test]
    fn test_missing_asset_fails_to_load() {
        let (mut device, _handle) = device();
        let mut player = WavMediaPlayer::new();
        let err = player
            .load(&mut device, Path::new("/nonexistent/lofi-calm.wav"))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(!player.is_loaded());
    }

    #[test]
    fn test_play_blocked_while_suspended() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir, 800);
        let (mut device, _handle) = device();
        let mut player = WavMediaPlayer::new();
        player.load(&mut device, &path).unwrap();

        let err = player.play(&mut device).unwrap_err();
        assert_eq!(err.error_code(), "PLAYBACK_BLOCKED");
        assert!(!player.is_playing());
    }

    #[test]
    fn test_plays_on_media_bus_and_pauses() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir, 800);
        let (mut device, handle) = device();
        device.resume();
        let mut player = WavMediaPlayer::new();
        player.load(&mut device, &path).unwrap();
        assert_eq!(player.source(), Some(path.as_path()));

        player.play(&mut device).unwrap();
        assert!(player.is_playing());
        let out = handle.render(100);
        assert!(out.iter().any(|s| s.abs() > 0.01));

        player.pause(&mut device);
        assert!(!player.is_playing());
        assert_eq!(player.position(), 100);
        let out = handle.render(100);
        assert!(out.iter().all(|&s| s == 0.0));

        player.rewind();
        assert_eq!(player.position(), 0);
    }

    #[test]
    fn test_position_wraps_when_looping() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir, 80);
        let (mut device, handle) = device();
        device.resume();
        let mut player = WavMediaPlayer::new();
        player.load(&mut device, &path).unwrap();
        player.play(&mut device).unwrap();
        handle.render(200);
        player.pause(&mut device);
        assert_eq!(player.position(), 40);
    }

    #[test]
    fn test_volume_sets_media_bus() {
        let (mut device, _handle) = device();
        let mut player = WavMediaPlayer::new();
        player.set_volume(&mut device, 1.4);
        assert_eq!(player.volume(), 1.0);
        assert_eq!(device.bus_gain(Bus::Media), 1.0);
    }
}
