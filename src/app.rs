use crate::config::{save_settings_atomic, Cli, Paths, Settings};
use crate::input::{InputSource, TermInput};
use crate::render::TermSurface;
use crate::scene::{GameScene, SplashScene};
use crate::storage::JsonFileStore;
use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Holds the loop to a fixed frame rate. Falls back into step when a frame
/// runs long instead of rushing to catch up.
pub(crate) struct FramePacer {
    frame: Duration,
    next: Instant,
}

impl FramePacer {
    pub(crate) fn new(fps: u32, now: Instant) -> Self {
        let frame = Duration::from_secs_f64(1.0 / f64::from(fps.clamp(10, 240)));
        Self {
            frame,
            next: now + frame,
        }
    }

    #[cfg(test)]
    pub(crate) fn frame(&self) -> Duration {
        self.frame
    }

    /// Sleeps until the next frame is due.
    pub(crate) fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            spin_sleep(self.next - now, now);
        }
        self.next = self.advance(self.next, Instant::now());
    }

    fn advance(&self, due: Instant, now: Instant) -> Instant {
        if now.saturating_duration_since(due) > self.frame * 4 {
            now + self.frame
        } else {
            due + self.frame
        }
    }
}

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

struct App {
    settings: Settings,
    stats_path: PathBuf,
    surface: TermSurface,
    input: TermInput,
    pacer: FramePacer,
}

impl App {
    fn init(settings: Settings, stats_path: PathBuf) -> anyhow::Result<Self> {
        let surface = TermSurface::begin(settings.enable_color)?;
        let pacer = FramePacer::new(settings.fps, Instant::now());
        Ok(Self {
            settings,
            stats_path,
            surface,
            input: TermInput::default(),
            pacer,
        })
    }

    /// Shows the logo for the configured time. Returns false if the player
    /// quit while it was up.
    fn splash(&mut self) -> anyhow::Result<bool> {
        if self.settings.splash_ms == 0 {
            return Ok(true);
        }
        let splash = SplashScene::enter(&mut self.surface)?;
        splash.render(&mut self.surface)?;

        let until = Instant::now() + Duration::from_millis(self.settings.splash_ms);
        while Instant::now() < until {
            if self.input.sample()?.quit {
                return Ok(false);
            }
            self.pacer.wait();
        }
        Ok(true)
    }

    fn play(&mut self) -> anyhow::Result<()> {
        let rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let store = JsonFileStore::new(&self.stats_path);
        let mut scene = match GameScene::enter(
            &mut self.surface,
            Box::new(store),
            chrono::Utc::now(),
            self.settings.behavior.clone(),
            rng,
        ) {
            Ok(scene) => scene,
            Err(err) => {
                tracing::error!(%err, "could not enter the game scene");
                return Err(err.into());
            }
        };
        tracing::info!(stats = %self.stats_path.display(), "game started");

        loop {
            let input = self.input.sample()?;
            if input.quit {
                break;
            }
            let redraw = scene.tick(input.keys);
            scene.render(&mut self.surface, redraw)?;
            self.pacer.wait();
        }

        tracing::info!(ticks = scene.ticks(), "game over");
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<()> {
        if self.splash()? {
            self.play()?;
        }
        Ok(())
    }
}

pub(crate) fn run(cli: &Cli, paths: &Paths, file_settings: &Settings) -> anyhow::Result<()> {
    let mut settings = file_settings.clone();
    settings.apply_cli(cli);
    let stats_path = cli
        .save
        .clone()
        .unwrap_or_else(|| paths.stats_path.clone());
    tracing::debug!(fps = settings.fps, seed = ?settings.seed, "starting");

    let mut app = App::init(settings, stats_path)?;
    let result = app.run();
    // the terminal goes back to normal whatever happened in the loop
    let restored = app.surface.end();
    if let Err(err) = &result {
        tracing::error!("{err:#}");
    }
    result?;
    restored?;

    save_settings_atomic(&paths.settings_path, file_settings)
        .with_context(|| format!("could not save {}", paths.settings_path.display()))?;
    Ok(())
}
