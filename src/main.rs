//! MindClear+ Audio CLI
//!
//! Audition, render and play the journal's procedural sounds.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use mindclear_audio::cli::commands;
use mindclear_audio::cli::{Cli, Commands};
use mindclear_audio::AudioConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("MindClear+ Audio v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => AudioConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AudioConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("MindClear+ Audio v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &AudioConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Cues => commands::list_cues(config)?,
        Commands::RenderCue { name, out, ducked } => {
            commands::render_cue(config, &name, &out, ducked)
                .with_context(|| format!("failed to render cue '{}'", name))?
        }
        Commands::RenderAmbient { kind, seconds, out } => {
            commands::render_ambient(config, &kind, seconds, &out)
                .with_context(|| format!("failed to render '{}' ambient", kind))?
        }
        Commands::Play { track, seconds } => {
            info!("Playing {} for {:.0}s", track, seconds);
            commands::play(config, &track, seconds)?
        }
        Commands::WriteConfig { path } => commands::write_config(&path)?,
    }
    Ok(())
}
