use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use dockhand::app::App;
use dockhand::backend::Backend;
use dockhand::backend::memory::InMemoryBackend;
use dockhand::config::Config;
use dockhand::event::EventHandler;
use dockhand::registry::ViewMode;
use dockhand::ui;

#[derive(Parser)]
#[command(name = "dockhand", version, about = "Terminal dashboard for containers, images, networks and services")]
struct Cli {
    #[arg(short, long, help = "Config file (default: <config dir>/dockhand/config.toml)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "JSON fixture for the in-memory backend")]
    fixture: Option<PathBuf>,

    #[arg(short, long, help = "Initial view (containers, images, networks, services)")]
    view: Option<ViewMode>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Write the effective config and exit")]
    write_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)?;
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(fixture) = &cli.fixture {
        config.fixture = Some(fixture.to_string_lossy().to_string());
    }
    if let Some(view) = cli.view {
        config.initial_view = view;
    }

    if cli.write_config {
        config.save_to(&config_path)?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    init_file_logging(&config)?;
    tracing::info!(config = %config_path.display(), "starting");

    let backend: Arc<dyn Backend> = match &config.fixture {
        Some(path) => Arc::new(
            InMemoryBackend::from_file(Path::new(path))
                .with_context(|| format!("loading fixture {path}"))?,
        ),
        None => Arc::new(InMemoryBackend::demo()?),
    };

    let events = EventHandler::new(Duration::from_millis(config.tick_rate_ms));
    let mut app = App::new(&config, backend, events.notifier())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "exiting with error");
        eprintln!("Error: {err:?}");
    }
    tracing::info!("stopped");

    Ok(())
}

fn init_file_logging(config: &Config) -> Result<()> {
    let path = Path::new(&config.log_file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
    }
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        app.handle_event(events.next()?);

        if app.should_quit() {
            return Ok(());
        }
    }
}
