use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use vigil_core::controller::ReactionController;
use vigil_core::logger;
use vigil_core::platform::{create_platform, Platform};
use vigil_core::sensing::{self, Orientation};
use vigil_core::settings::Settings;
use vigil_core::types::{Capture, GameWindowFrame, ResourceKind};

/// Watches game resource bars and reacts with potions and spells
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version)]
struct Cli {
    /// Log actions instead of injecting input
    #[arg(long)]
    stub: bool,

    /// Settings file, created on first save
    #[arg(long, value_name = "PATH", default_value = "settings.json")]
    config: PathBuf,

    /// Directory for the daily vigil.*.log files
    #[arg(long, value_name = "DIR", default_value = "logs")]
    logs: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive status screen (default)
    Tui,
    /// Run the controller without a UI, then stop and save
    Headless {
        #[arg(long, default_value = "60")]
        seconds: u64,
    },
    /// Measure a bar from a saved screenshot
    Measure {
        #[arg(long, value_name = "PNG")]
        image: PathBuf,
        #[arg(long, default_value = "health")]
        resource: ResourceKind,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None | Some(Command::Tui) => run_tui(&cli),
        Some(Command::Headless { seconds }) => run_headless(&cli, seconds),
        Some(Command::Measure { ref image, resource }) => run_measure(&cli, image, resource),
    }
}

/// Configured frame wins; otherwise use the window matching `window_title`.
fn resolve_game_window(settings: &Settings, platform: &Platform) -> Option<GameWindowFrame> {
    let found = platform.locator.find_window(&settings.window_title);
    match (settings.game_window(), found) {
        (Some(frame), found) => Some(GameWindowFrame { window_id: found.map(|w| w.id), ..frame }),
        (None, Some(w)) => Some(GameWindowFrame { rect: w.rect.normalized(), window_id: Some(w.id) }),
        (None, None) => {
            warn!("no window matching '{}', spells will be key-only unless a zone is set", settings.window_title);
            None
        }
    }
}

fn build_controller(cli: &Cli) -> ReactionController {
    let platform = create_platform(cli.stub);
    let settings = Settings::load(&cli.config);
    let frame = resolve_game_window(&settings, &platform);

    let controller = ReactionController::from_platform(settings.shared(), &platform)
        .with_settings_path(cli.config.clone());
    controller.set_game_window(frame);
    controller
}

fn run_tui(cli: &Cli) -> Result<()> {
    let (log_tx, log_rx) = mpsc::channel();
    let _guard = logger::init(&cli.logs, Some(log_tx)).context("failed to set up logging")?;
    info!("vigil started");

    let controller = build_controller(cli);
    let mut app = vigil_tui::App::new(controller, log_rx, cli.config.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = vigil_tui::event::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    app.controller.stop();
    result
}

fn run_headless(cli: &Cli, seconds: u64) -> Result<()> {
    let _guard = logger::init(&cli.logs, None).context("failed to set up logging")?;
    let mut controller = build_controller(cli);

    info!("running headless for {}s", seconds);
    controller.start();
    thread::sleep(Duration::from_secs(seconds));
    controller.stop();

    let status = controller.status_snapshot();
    println!(
        "ticks {}  potions hp/mp/sp {}/{}/{}  spells {}",
        status.ticks, status.potions_used[0], status.potions_used[1], status.potions_used[2], status.spells_cast
    );
    if let Some(err) = status.last_error {
        println!("last error: {}", err);
    }
    Ok(())
}

fn run_measure(cli: &Cli, path: &Path, resource: ResourceKind) -> Result<()> {
    let _guard = logger::init(&cli.logs, None).context("failed to set up logging")?;
    let settings = Settings::load(&cli.config);
    let range = *settings.color_ranges.get(resource);

    let capture = load_capture(path)?;
    let orientation = Orientation::classify(capture.width, capture.height);
    let percent = sensing::try_measure(&capture, &range)
        .with_context(|| format!("cannot read {}", path.display()))?;

    println!(
        "{} {}x{} {:?}: {:.1}%",
        resource, capture.width, capture.height, orientation, percent
    );
    Ok(())
}

/// Load an image file as a BGRA capture.
fn load_capture(path: &Path) -> Result<Capture> {
    let img = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    let data = img
        .pixels()
        .flat_map(|p| {
            let [r, g, b, a] = p.0;
            [b, g, r, a]
        })
        .collect();
    Ok(Capture { data, width, height, bytes_per_row: width * 4 })
}
