//! Engine configuration
//!
//! Settings are plain JSON so the host application can ship a file next to
//! its audio assets. Every field has a default; missing fields are filled in
//! and out-of-range values are clamped on load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MindclearError, Result};

/// Sample rate used when no device dictates one
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default background music volume (30%)
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.3;

/// Procedural layers are quieter than recorded tracks by this factor
pub const DEFAULT_AMBIENT_SCALE: f32 = 0.1;

/// Master level of the cue bus
pub const DEFAULT_EFFECTS_GAIN: f32 = 0.3;

/// Cue loudness multiplier while background music plays
pub const DEFAULT_DUCKING_FACTOR: f32 = 0.7;

/// Minimum gap between two typing ticks
pub const DEFAULT_TYPING_INTERVAL_MS: u64 = 100;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate for offline rendering and the null device
    pub sample_rate: u32,

    /// Keep the device dormant until the first user gesture resumes it
    pub start_suspended: bool,

    /// Level of the single master volume node
    pub master_volume: f32,

    /// Initial background music volume
    pub music_volume: f32,

    /// Scale applied to the music volume when the ambient engine plays
    pub ambient_scale: f32,

    /// Level of the cue bus
    pub effects_gain: f32,

    /// Multiplier applied to every cue while music plays
    pub ducking_factor: f32,

    /// Minimum gap between typing ticks in milliseconds
    pub typing_interval_ms: u64,

    /// Directory pre-recorded tracks are resolved against
    pub asset_dir: PathBuf,

    /// Track key -> asset file name
    pub tracks: BTreeMap<String, String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let mut tracks = BTreeMap::new();
        tracks.insert("LOFI_CALM".to_string(), "lofi-calm.wav".to_string());
        tracks.insert("NATURE_SOUNDS".to_string(), "nature-sounds.wav".to_string());
        tracks.insert("AMBIENT".to_string(), "ambient.wav".to_string());

        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            start_suspended: true,
            master_volume: 1.0,
            music_volume: DEFAULT_MUSIC_VOLUME,
            ambient_scale: DEFAULT_AMBIENT_SCALE,
            effects_gain: DEFAULT_EFFECTS_GAIN,
            ducking_factor: DEFAULT_DUCKING_FACTOR,
            typing_interval_ms: DEFAULT_TYPING_INTERVAL_MS,
            asset_dir: PathBuf::from("audio"),
            tracks,
        }
    }
}

impl AudioConfig {
    /// Load a configuration file, filling in defaults for missing fields
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MindclearError::AssetNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        let config: AudioConfig = serde_json::from_str(&text)?;
        config.sanitized()
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Clamp levels into `[0, 1]` and reject settings the engine can't run with
    pub fn sanitized(mut self) -> Result<Self> {
        if self.sample_rate < 8000 || self.sample_rate > 192_000 {
            return Err(MindclearError::InvalidConfig {
                reason: format!("sample_rate {} outside 8000..=192000", self.sample_rate),
            });
        }
        self.master_volume = clamp_unit(self.master_volume);
        self.music_volume = clamp_unit(self.music_volume);
        self.ambient_scale = clamp_unit(self.ambient_scale);
        self.effects_gain = clamp_unit(self.effects_gain);
        self.ducking_factor = clamp_unit(self.ducking_factor);
        Ok(self)
    }

    /// Resolve a track key to the asset path it names, if any
    pub fn track_path(&self, key: &str) -> Option<PathBuf> {
        self.tracks.get(key).map(|file| self.asset_dir.join(file))
    }
}

/// Clamp a level into `[0, 1]`, mapping NaN to silence
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_tracks() {
        let config = AudioConfig::default();
        assert_eq!(
            config.track_path("NATURE_SOUNDS"),
            Some(PathBuf::from("audio").join("nature-sounds.wav"))
        );
        assert_eq!(config.track_path("JAZZ"), None);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.json");

        let mut config = AudioConfig::default();
        config.music_volume = 0.5;
        config.save(&path).unwrap();

        assert_eq!(AudioConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.json");
        fs::write(&path, r#"{ "master_volume": 3.5, "typing_interval_ms": 50 }"#).unwrap();

        let config = AudioConfig::load(&path).unwrap();
        assert_eq!(config.master_volume, 1.0);
        assert_eq!(config.typing_interval_ms, 50);
        assert_eq!(config.music_volume, DEFAULT_MUSIC_VOLUME);
    }

    #[test]
    fn test_bad_sample_rate_rejected() {
        let config = AudioConfig {
            sample_rate: 10,
            ..AudioConfig::default()
        };
        assert!(config.sanitized().is_err());
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(7.0), 1.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }
}
