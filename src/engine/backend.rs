//! Audio output backends
//!
//! A backend owns whatever drives the [`Renderer`]: a live device stream,
//! or a handle the caller pulls blocks from. Opening a backend hands the
//! renderer over for good.

use std::sync::{Arc, Mutex};

use log::info;

use crate::config::AudioConfig;
use crate::engine::renderer::Renderer;
use crate::error::{MindclearError, Result};

/// Something that can drive a [`Renderer`]
pub trait AudioBackend {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Sample rate the renderer must produce
    fn sample_rate(&self) -> u32;

    /// Take ownership of the renderer and start pulling audio from it
    fn open(&mut self, renderer: Renderer) -> Result<()>;

    /// Pause or resume the underlying stream, if it has one
    fn set_active(&mut self, _active: bool) -> Result<()> {
        Ok(())
    }
}

/// Builds the backend on first use of the session
pub type BackendFactory = Box<dyn FnOnce(&AudioConfig) -> Result<Box<dyn AudioBackend>>>;

/// The backend used when none is supplied
///
/// Live output when built with the `device` feature, otherwise a backend
/// that reports no device so the session runs silently.
pub fn default_backend(config: &AudioConfig) -> Result<Box<dyn AudioBackend>> {
    #[cfg(feature = "device")]
    {
        let _ = config;
        Ok(Box::new(cpal_backend::CpalBackend::new()?))
    }
    #[cfg(not(feature = "device"))]
    {
        Ok(Box::new(NullBackend::new(config.sample_rate)))
    }
}

// ============================================================================
// Null backend
// ============================================================================

/// A backend with no device behind it; opening always fails
#[derive(Debug, Clone)]
pub struct NullBackend {
    sample_rate: u32,
}

impl NullBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn open(&mut self, _renderer: Renderer) -> Result<()> {
        Err(MindclearError::DeviceUnavailable {
            reason: "no audio output available".to_string(),
        })
    }
}

// ============================================================================
// Offline backend
// ============================================================================

/// A backend whose audio is pulled on demand through an [`OfflineHandle`]
///
/// Used for rendering to WAV and for deterministic tests.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
    slot: Arc<Mutex<Option<Renderer>>>,
}

/// Pulls rendered audio out of an [`OfflineBackend`]
#[derive(Debug, Clone)]
pub struct OfflineHandle {
    slot: Arc<Mutex<Option<Renderer>>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for rendering once the session has opened this backend
    pub fn handle(&self) -> OfflineHandle {
        OfflineHandle {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn open(&mut self, renderer: Renderer) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| MindclearError::StreamError {
            reason: "offline renderer lock poisoned".to_string(),
        })?;
        *slot = Some(renderer);
        info!("Offline renderer ready at {} Hz", self.sample_rate);
        Ok(())
    }
}

impl OfflineHandle {
    /// Render `frames` mono frames; silence if the session never opened
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(renderer) = slot.as_mut() {
                renderer.render(&mut out, 1);
            }
        }
        out
    }

    /// Render `seconds` of audio in device-sized blocks
    pub fn render_seconds(&self, seconds: f64) -> Vec<f32> {
        const BLOCK: usize = 512;
        let sample_rate = self.sample_rate().unwrap_or(0) as f64;
        let total = (seconds * sample_rate).round() as usize;
        let mut out = Vec::with_capacity(total);
        while out.len() < total {
            let n = BLOCK.min(total - out.len());
            out.extend(self.render(n));
        }
        out
    }

    /// Sample rate of the opened renderer
    pub fn sample_rate(&self) -> Option<u32> {
        self.slot
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|r| r.sample_rate()))
    }

    /// Whether a session has opened the backend
    pub fn is_open(&self) -> bool {
        self.sample_rate().is_some()
    }
}

// ============================================================================
// Live device backend
// ============================================================================

#[cfg(feature = "device")]
pub mod cpal_backend {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, Stream, StreamConfig};
    use log::{info, warn};

    use super::AudioBackend;
    use crate::engine::renderer::Renderer;
    use crate::error::{MindclearError, Result};

    /// Plays through the host's default output device
    pub struct CpalBackend {
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
        stream: Option<Stream>,
    }

    impl CpalBackend {
        pub fn new() -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| MindclearError::DeviceUnavailable {
                    reason: "no default output device".to_string(),
                })?;
            let supported =
                device
                    .default_output_config()
                    .map_err(|e| MindclearError::DeviceUnavailable {
                        reason: e.to_string(),
                    })?;
            let sample_format = supported.sample_format();
            let config: StreamConfig = supported.into();
            info!(
                "Output device: {} ({} Hz, {} ch, {:?})",
                device.name().unwrap_or_else(|_| "unknown".to_string()),
                config.sample_rate.0,
                config.channels,
                sample_format
            );
            Ok(Self {
                device,
                config,
                sample_format,
                stream: None,
            })
        }

        fn stream_error(e: impl std::fmt::Display) -> MindclearError {
            MindclearError::StreamError {
                reason: e.to_string(),
            }
        }
    }

    impl AudioBackend for CpalBackend {
        fn name(&self) -> &str {
            "cpal"
        }

        fn sample_rate(&self) -> u32 {
            self.config.sample_rate.0
        }

        fn open(&mut self, mut renderer: Renderer) -> Result<()> {
            let channels = self.config.channels as usize;
            let err_fn = |err: cpal::StreamError| warn!("Audio stream error: {}", err);

            let stream = match self.sample_format {
                SampleFormat::F32 => self.device.build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        renderer.render(data, channels);
                    },
                    err_fn,
                    None,
                ),
                SampleFormat::I16 => {
                    let mut scratch = Vec::new();
                    self.device.build_output_stream(
                        &self.config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            scratch.resize(data.len(), 0.0);
                            renderer.render(&mut scratch, channels);
                            for (out, s) in data.iter_mut().zip(scratch.iter()) {
                                *out = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            }
                        },
                        err_fn,
                        None,
                    )
                }
                SampleFormat::U16 => {
                    let mut scratch = Vec::new();
                    self.device.build_output_stream(
                        &self.config,
                        move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                            scratch.resize(data.len(), 0.0);
                            renderer.render(&mut scratch, channels);
                            for (out, s) in data.iter_mut().zip(scratch.iter()) {
                                *out = ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16;
                            }
                        },
                        err_fn,
                        None,
                    )
                }
                other => {
                    return Err(MindclearError::UnsupportedFormat {
                        format: format!("output sample format {:?}", other),
                    })
                }
            }
            .map_err(Self::stream_error)?;

            stream.play().map_err(Self::stream_error)?;
            self.stream = Some(stream);
            Ok(())
        }

        fn set_active(&mut self, active: bool) -> Result<()> {
            if let Some(stream) = self.stream.as_ref() {
                if active {
                    stream.play().map_err(Self::stream_error)?;
                } else {
                    stream.pause().map_err(Self::stream_error)?;
                }
            }
            Ok(())
        }
    }
}
