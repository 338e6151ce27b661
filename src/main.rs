//! plugin-deals-notifier: watches a deals RSS feed from the terminal and
//! announces when the listing changes.
//!
//! ## Architecture overview
//!
//! ```text
//!                 ┌─────────────── poll thread ───────────────┐
//!                 │ source ─► filter ─► detect ─► notify      │
//!                 │        (poll.rs, timer + Poller)          │
//!                 └───────▲───────────────┬──────────┬────────┘
//!         Refresh/Rearm/  │      Snapshot │   Notice │ (channel)
//!         Quit (channel)  │               ▼          ▼
//!                 ┌───────┴───────────────────────────────────┐
//!                 │ main thread: app.rs state, ui.rs render,  │
//!                 │ input.rs keys ─► Action ─► PollHandle     │
//!                 └───────────────────────────────────────────┘
//! ```
//!
//! * **`source/`**: the `DataSource` trait and the RSS implementation.
//! * **`filter`** / **`detect`**: keyword filtering and change detection.
//! * **`poll`**: the re-armable timer, poll cycle and `PollHandle` controls.
//! * **`settings`**: user settings and their JSON file.
//! * **`notify`** / **`startup`**: notification delivery and login launch.
//! * **`app`** / **`ui`** / **`input`**: the terminal front end.

mod app;
mod detect;
mod error;
mod filter;
mod input;
mod notify;
mod poll;
mod settings;
mod source;
mod startup;
mod ui;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use error::ControlError;
use input::Action;
use notify::ChannelSink;
use poll::{PollHandle, Poller};
use settings::{FilterMode, FilterRule, SettingsStore};
use source::RssSource;
use startup::SystemAutostart;

const DEFAULT_FEED_URL: &str = "https://plugindealz.com/board/rss.php";
const APP_DIR: &str = "plugin-deals-notifier";

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// RSS feed to watch.
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Settings file [default: <config dir>/plugin-deals-notifier/settings.json]
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log file; the terminal is taken by the UI.
    /// [default: <data dir>/plugin-deals-notifier/notifier.log]
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|d| d.join(APP_DIR).join("settings.json"))
                .unwrap_or_else(|| PathBuf::from("rss_reader_settings.json"))
        })
    }

    fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join(APP_DIR).join("notifier.log"))
                .unwrap_or_else(|| PathBuf::from("notifier.log"))
        })
    }
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    fn bell(&mut self) {
        let backend = self.terminal.backend_mut();
        let _ = backend.write_all(b"\x07").and_then(|()| backend.flush());
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Carry out a UI action and report the outcome in the status bar.
fn dispatch(action: Action, handle: &PollHandle, app: &mut App) {
    let outcome: Result<String, ControlError> = match action {
        Action::Refresh => {
            let since = handle.progress();
            handle.manual_refresh();
            app.await_poll("Refreshing…", since);
            return;
        }
        Action::OpenSelected => {
            let message = match app.selected_link() {
                Some(link) => match open::that_detached(link) {
                    Ok(()) => format!("Opened {link}"),
                    Err(e) => {
                        warn!(link, "failed to open link: {e}");
                        format!("Error: could not open {link}: {e}")
                    }
                },
                None => "No link for this entry".to_string(),
            };
            app.set_message(message);
            return;
        }
        Action::SubmitInterval(text) => settings::parse_minutes(&text)
            .map_err(ControlError::from)
            .and_then(|minutes| handle.set_interval(minutes))
            .map(|i| format!("Auto-refresh interval set to {} minute(s).", i.minutes())),
        Action::SubmitKeywords(text) => handle
            .set_filter_rule(FilterRule::from_keyword_list(&text))
            .map(|()| "Keywords set".to_string()),
        Action::ToggleFilterMode => {
            let rule = match app.settings.filter_mode {
                FilterMode::All => FilterRule::KeywordMatch(app.settings.keywords.clone()),
                FilterMode::Keywords => FilterRule::AllEntries,
            };
            handle
                .set_filter_rule(rule)
                .map(|()| "Notifier mode changed".to_string())
        }
        Action::ToggleNotifications => {
            let disabled = !app.settings.notifications_disabled;
            handle.set_notifications_disabled(disabled).map(|()| {
                if disabled {
                    "Notifications disabled".to_string()
                } else {
                    "Notifications enabled".to_string()
                }
            })
        }
        Action::ToggleStartup => {
            let enabled = !app.settings.load_on_startup;
            handle.set_load_on_startup(enabled).map(|()| {
                if enabled {
                    "The app will now load on startup".to_string()
                } else {
                    "The app will no longer load on startup".to_string()
                }
            })
        }
    };

    match outcome {
        Ok(message) => app.set_message(message),
        Err(e) => {
            warn!("{e}");
            app.set_message(format!("Error: {e}"));
        }
    }
    app.settings = handle.settings();
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_path())?;
    install_panic_hook();

    // -- settings, source, poller --------------------------------------------
    let settings = Arc::new(SettingsStore::open(cli.settings_path()));
    let source = RssSource::new(&cli.feed_url, "Plugin Deals")
        .context("building HTTP client")?;
    info!(
        url = source.url(),
        settings = ?settings.path(),
        "starting"
    );

    let (sink, notices) = ChannelSink::new();
    let poller = Arc::new(Poller::new(Box::new(source), settings, Box::new(sink)));
    let handle = poll::spawn(poller, Box::new(SystemAutostart))
        .context("starting poll scheduler")?;

    // -- terminal setup (the guard restores it on exit or panic) ------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(handle.settings());
    app.apply_snapshot(handle.snapshot());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Pick up a newer poll result and any notifications.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Sync with the poller
        if let Some(snapshot) = handle.snapshot_since(app.generation()) {
            app.apply_snapshot(snapshot);
        }
        app.settle_status(handle.progress());
        app.next_poll = handle.schedule();
        while let Ok(notice) = notices.try_recv() {
            app.show_notice(notice);
            guard.bell();
        }

        // 2. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 3. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(action) = input::handle_key_event(&mut app, key) {
                    dispatch(action, &handle, &mut app);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    handle.quit();
    info!("quit");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
