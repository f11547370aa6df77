use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Per-tick odds and ranges for the cat's idle behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Behavior {
    /// Chance of starting a walk on an idle tick is `1 / walk_one_in`. 0 disables.
    pub(crate) walk_one_in: u32,
    /// Chance of reacting to the current stats is `1 / react_one_in`. 0 disables.
    pub(crate) react_one_in: u32,
    pub(crate) walk_distance_min: i32,
    pub(crate) walk_distance_max: i32,
    pub(crate) react_emote_ticks: u32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            walk_one_in: 130,
            react_one_in: 600,
            walk_distance_min: 30,
            walk_distance_max: 70,
            react_emote_ticks: 100,
        }
    }
}

impl Behavior {
    /// Never rolls; the cat only moves when told to.
    #[cfg(test)]
    pub(crate) fn still() -> Self {
        Self {
            walk_one_in: 0,
            react_one_in: 0,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps: u32,
    pub(crate) splash_ms: u64,
    pub(crate) enable_color: bool,
    pub(crate) seed: Option<u64>,
    pub(crate) log_level: String,
    pub(crate) behavior: Behavior,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: crate::model::FPS,
            splash_ms: 2000,
            enable_color: true,
            seed: None,
            log_level: "info".to_string(),
            behavior: Behavior::default(),
        }
    }
}

impl Settings {
    /// Command line flags win over the settings file.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) {
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
        if let Some(fps) = cli.fps {
            self.fps = fps;
        }
        if cli.no_splash {
            self.splash_ms = 0;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    pub(crate) fn log_level(&self) -> tracing::Level {
        self.log_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

#[derive(Debug, Parser)]
#[command(name = "tomogotchi", about = "Look after a tiny cat that lives in your terminal")]
pub(crate) struct Cli {
    /// Seed for the cat's behaviour and item placement.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Target frames per second.
    #[arg(long)]
    pub(crate) fps: Option<u32>,
    /// Where to keep hunger and joy (defaults to the data directory).
    #[arg(long, value_name = "PATH")]
    pub(crate) save: Option<PathBuf>,
    /// Skip the splash screen.
    #[arg(long)]
    pub(crate) no_splash: bool,
    /// trace, debug, info, warn or error.
    #[arg(long, value_name = "LEVEL")]
    pub(crate) log_level: Option<String>,
}

pub(crate) struct Paths {
    pub(crate) stats_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "tomogotchi", "Tomogotchi")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data directory {}", dir.display()))?;
    Ok(Paths {
        stats_path: dir.join("data.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("tomogotchi.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> io::Result<()> {
    // rename over an existing file fails on Windows
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}
