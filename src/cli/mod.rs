//! CLI Module
//!
//! Command-line interface for auditioning and rendering MindClear+ sounds.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MindClear+ Audio - procedural ambient music and UI sound cues
#[derive(Parser, Debug)]
#[command(name = "mindclear-audio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every cue in the catalog
    #[command(name = "cues")]
    Cues,

    /// Render one cue to a WAV file
    #[command(name = "render-cue")]
    RenderCue {
        /// Cue name (click, success, whoosh, burn, notification, type, or an emotion)
        name: String,

        /// Output WAV file
        #[arg(short, long)]
        out: PathBuf,

        /// Simulate background music playing (ducked levels)
        #[arg(long)]
        ducked: bool,
    },

    /// Render the procedural ambient session to a WAV file
    #[command(name = "render-ambient")]
    RenderAmbient {
        /// Ambient kind: lofi or nature
        kind: String,

        /// Length in seconds
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        /// Output WAV file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Play a background track on the output device
    #[command(name = "play")]
    Play {
        /// Track key (LOFI_CALM, NATURE_SOUNDS, AMBIENT)
        #[arg(default_value = "LOFI_CALM")]
        track: String,

        /// How long to play, in seconds
        #[arg(short, long, default_value_t = 30.0)]
        seconds: f64,
    },

    /// Write the default configuration to a file
    #[command(name = "write-config")]
    WriteConfig {
        /// Destination path
        path: PathBuf,
    },
}
