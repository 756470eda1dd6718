//! Error handling for the MindClear audio engine
//!
//! Errors exist for the engine's internal plumbing only. The collaborator
//! surface in [`crate::system`] absorbs every one of them and degrades to
//! silence or to procedural fallback.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, MindclearError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum MindclearError {
    // Device Errors
    #[error("Audio device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Audio session is disabled")]
    DeviceDisabled,

    #[error("Audio stream error: {reason}")]
    StreamError { reason: String },

    // Asset Errors
    #[error("Audio asset not found: {path}")]
    AssetNotFound { path: PathBuf },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Playback Errors
    #[error("Playback blocked: {reason}")]
    PlaybackBlocked { reason: String },

    #[error("No media loaded")]
    NothingLoaded,

    // Catalog Errors
    #[error("Unknown cue: {name}")]
    UnknownCue { name: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MindclearError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MindclearError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            MindclearError::DeviceDisabled => "DEVICE_DISABLED",
            MindclearError::StreamError { .. } => "STREAM_ERROR",
            MindclearError::AssetNotFound { .. } => "ASSET_NOT_FOUND",
            MindclearError::InvalidAudio { .. } => "INVALID_AUDIO",
            MindclearError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            MindclearError::PlaybackBlocked { .. } => "PLAYBACK_BLOCKED",
            MindclearError::NothingLoaded => "NOTHING_LOADED",
            MindclearError::UnknownCue { .. } => "UNKNOWN_CUE",
            MindclearError::InvalidConfig { .. } => "INVALID_CONFIG",
            MindclearError::Io(_) => "IO_ERROR",
            MindclearError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check whether procedural synthesis can stand in for the failed operation
    ///
    /// Asset and playback failures fall back to the ambient engine. A missing
    /// device never recovers for the lifetime of the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MindclearError::AssetNotFound { .. }
                | MindclearError::InvalidAudio { .. }
                | MindclearError::UnsupportedFormat { .. }
                | MindclearError::PlaybackBlocked { .. }
                | MindclearError::NothingLoaded
        )
    }
}

impl From<hound::Error> for MindclearError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => MindclearError::Io(io),
            hound::Error::Unsupported => MindclearError::UnsupportedFormat {
                format: "WAV variant not supported".to_string(),
            },
            other => MindclearError::InvalidAudio {
                reason: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
