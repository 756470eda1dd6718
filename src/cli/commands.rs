//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::AudioConfig;
use crate::cues::{Cue, CueLibrary};
use crate::engine::{write_wav, DeviceSession, ExportFormat, OfflineBackend};
use crate::error::{MindclearError, Result};
use crate::music::{AmbientEngine, AmbientKind};
use crate::SoundSystem;

/// Silence rendered after a cue's last event
const CUE_TAIL_SECS: f64 = 0.1;

/// Longest render or playback the CLI accepts (one hour)
const MAX_SECONDS: f64 = 3600.0;

/// Reject lengths that are not in `(0, MAX_SECONDS]`
fn check_seconds(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && seconds > 0.0 && seconds <= MAX_SECONDS {
        Ok(seconds)
    } else {
        Err(MindclearError::InvalidConfig {
            reason: format!("length must be in (0, {}] s, got {}", MAX_SECONDS, seconds),
        })
    }
}

/// Session on an offline backend, already resumed
fn offline_device(config: &AudioConfig) -> (DeviceSession, crate::engine::OfflineHandle) {
    let backend = OfflineBackend::new(config.sample_rate);
    let handle = backend.handle();
    let mut device = DeviceSession::with_backend(config.clone(), Box::new(backend));
    device.resume();
    (device, handle)
}

/// List the cue catalog.
pub fn list_cues(config: &AudioConfig) -> Result<()> {
    let mut library = CueLibrary::new(config);

    println!("{:<14} {:>7} {:>9}", "CUE", "EVENTS", "LENGTH");
    println!("{:-<32}", "");
    for cue in Cue::ALL {
        let plan = library.plan(cue, false);
        let length = plan.iter().map(|e| e.end_time()).fold(0.0, f64::max);
        println!("{:<14} {:>7} {:>8.2}s", cue.name(), plan.len(), length);
    }
    println!("{:-<32}", "");
    println!("Emotions also accept: bahagia, sedih, cemas, stres, marah, bingung");

    Ok(())
}

/// Render one cue offline and return the mono samples.
pub fn render_cue_samples(config: &AudioConfig, cue: Cue, ducked: bool) -> Result<Vec<f32>> {
    let (mut device, handle) = offline_device(config);
    let mut library = CueLibrary::new(config);

    let length = library
        .plan(cue, ducked)
        .iter()
        .map(|e| e.end_time())
        .fold(0.0, f64::max);
    if library.play(&mut device, cue, ducked) == 0 {
        return Err(MindclearError::DeviceDisabled);
    }

    Ok(handle.render_seconds(length + CUE_TAIL_SECS))
}

/// Render one cue to a WAV file.
pub fn render_cue(config: &AudioConfig, name: &str, out: &Path, ducked: bool) -> Result<()> {
    let cue: Cue = name.parse()?;
    info!("Rendering cue {} to {}", cue, out.display());

    let samples = render_cue_samples(config, cue, ducked)?;
    write_wav(out, &samples, ExportFormat::new(config.sample_rate, 16))?;

    println!(
        "Rendered {} ({:.2}s{}) to {}",
        cue,
        samples.len() as f64 / config.sample_rate as f64,
        if ducked { ", ducked" } else { "" },
        out.display()
    );
    Ok(())
}

/// Render an ambient session offline and return the mono samples.
pub fn render_ambient_samples(
    config: &AudioConfig,
    kind: AmbientKind,
    seconds: f64,
) -> Result<Vec<f32>> {
    let seconds = check_seconds(seconds)?;
    let (mut device, handle) = offline_device(config);
    let mut ambient = AmbientEngine::default();
    ambient.set_volume(&mut device, config.music_volume);
    if !ambient.start(&mut device, kind) {
        return Err(MindclearError::DeviceDisabled);
    }

    let samples = handle.render_seconds(seconds);
    ambient.stop(&mut device);
    Ok(samples)
}

/// Render an ambient session to a WAV file.
pub fn render_ambient(config: &AudioConfig, kind: &str, seconds: f64, out: &Path) -> Result<()> {
    let kind: AmbientKind = kind.parse()?;
    info!("Rendering {:.1}s of {} ambient to {}", seconds, kind, out.display());

    let samples = render_ambient_samples(config, kind, seconds)?;
    // Ambient peaks sit near -34 dBFS; 32-bit float keeps the detail
    write_wav(out, &samples, ExportFormat::new(config.sample_rate, 32))?;

    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    println!(
        "Rendered {} ambient ({:.1}s, peak {:.4}) to {}",
        kind,
        seconds,
        peak,
        out.display()
    );
    Ok(())
}

/// Play a background track on the output device.
pub fn play(config: &AudioConfig, track: &str, seconds: f64) -> Result<()> {
    let seconds = check_seconds(seconds)?;
    let mut sound = SoundSystem::new(config.clone());

    let playing = sound.play_background_music(track);
    if sound.device().is_disabled() {
        warn!("No output device; rebuild with `--features device` for live playback");
        return Err(MindclearError::DeviceDisabled);
    }

    let status = sound.get_music_status();
    println!(
        "Now playing: {} (volume {:.0}%)",
        status.current_track.as_deref().unwrap_or("nothing"),
        status.volume * 100.0
    );
    if playing {
        thread::sleep(Duration::from_secs_f64(seconds));
    }

    sound.shutdown();
    println!("Stopped.");
    Ok(())
}

/// Write the default configuration.
pub fn write_config(path: &Path) -> Result<()> {
    AudioConfig::default().save(path)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::read_wav_mono;
    use tempfile::tempdir;

    fn small_config() -> AudioConfig {
        AudioConfig {
            sample_rate: 16000,
            ..AudioConfig::default()
        }
    }

    #[test]
    fn test_render_cue_length_covers_every_event() {
        let samples = render_cue_samples(&small_config(), Cue::Success, false).unwrap();
        // Last note starts at 0.35 s and lasts 0.2 s
        assert_eq!(samples.len(), ((0.55 + CUE_TAIL_SECS) * 16000.0_f64).round() as usize);
        assert!(samples.iter().any(|s| s.abs() > 1e-3));
    }

    #[test]
    fn test_ducked_render_is_quieter() {
        let config = small_config();
        let loud = render_cue_samples(&config, Cue::Click, false).unwrap();
        let soft = render_cue_samples(&config, Cue::Click, true).unwrap();
        let peak = |s: &[f32]| s.iter().fold(0.0_f32, |m, x| m.max(x.abs()));
        assert!(peak(&soft) < peak(&loud));
    }

    #[test]
    fn test_render_cue_writes_wav() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("burn.wav");
        render_cue(&small_config(), "burn", &out, false).unwrap();
        let samples = read_wav_mono(&out, 16000).unwrap();
        assert!(samples.len() > 16000);
    }

    #[test]
    fn test_render_unknown_cue_fails() {
        let dir = tempdir().unwrap();
        let err = render_cue(&small_config(), "kazoo", &dir.path().join("x.wav"), false).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CUE");
    }

    #[test]
    fn test_render_ambient() {
        let samples = render_ambient_samples(&small_config(), AmbientKind::Nature, 0.5).unwrap();
        assert_eq!(samples.len(), 8000);
        assert!(samples.iter().any(|s| *s != 0.0));

        assert!(render_ambient_samples(&small_config(), AmbientKind::Lofi, 0.0).is_err());
    }

    #[test]
    fn test_out_of_range_lengths_rejected() {
        for seconds in [f64::INFINITY, f64::NAN, -1.0, MAX_SECONDS + 1.0] {
            let err = render_ambient_samples(&small_config(), AmbientKind::Nature, seconds)
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG");
            let err = play(&small_config(), "LOFI_CALM", seconds).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG");
        }
        assert_eq!(check_seconds(MAX_SECONDS).unwrap(), MAX_SECONDS);
    }

    #[test]
    fn test_write_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.json");
        write_config(&path).unwrap();
        assert_eq!(AudioConfig::load(&path).unwrap(), AudioConfig::default());
    }
}
