mod app;
mod button;
mod cat;
mod config;
mod input;
mod model;
mod physics;
mod render;
mod scene;
mod sprite;
mod storage;
mod surface;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

fn init_logging(path: &Path, level: tracing::Level) -> Result<()> {
    // stdout belongs to the game, so logs go to a file
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let paths = config::project_paths()?;
    let settings = config::load_settings(&paths.settings_path);
    let level = cli
        .log_level
        .as_deref()
        .and_then(|l| l.parse().ok())
        .unwrap_or_else(|| settings.log_level());
    init_logging(&paths.log_path, level)?;
    app::run(&cli, &paths, &settings)
}
