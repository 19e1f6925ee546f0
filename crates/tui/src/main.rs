mod app;
mod renderer;

use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tilelane_core::{Timeline, TimelineConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::renderer::CELL_H;

/// Browse a lane timeline in the terminal.
#[derive(Debug, Parser)]
#[command(name = "tilelane", version, about)]
struct Cli {
    /// Timeline document (JSON)
    document: PathBuf,

    /// Partial TimelineConfig as JSON; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file, filtered by TILELANE_LOG
    #[arg(long)]
    log: Option<PathBuf>,
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("TILELANE_LOG").unwrap_or_else(|_| "tilelane_core=debug,info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Host defaults: one minimap row per terminal row. A config file
/// overrides them field by field.
fn load_config(path: Option<&Path>) -> Result<TimelineConfig> {
    let base = TimelineConfig {
        minimap_tile_size: CELL_H,
        ..TimelineConfig::default()
    };
    match path {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
            Ok(TimelineConfig::from_json_over(&base, &data)?)
        }
        None => Ok(base),
    }
}

fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| -> Result<()> {
        loop {
            let size = terminal.size()?;
            app.resize(size.width, size.height);
            terminal.draw(|frame| app.draw(frame))?;

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !app.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let config = load_config(cli.config.as_deref())?;
    let data = std::fs::read(&cli.document).with_context(|| format!("reading {}", cli.document.display()))?;
    let timeline = Timeline::from_json(config, &data)?;
    info!(document = %cli.document.display(), lanes = timeline.lanes().len(), "document loaded");

    let mut app = App::new(timeline)?;
    run(&mut app)
}
