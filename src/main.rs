use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use feedchat_core::{AppShell, Config, CredentialStore, FileStore, ServiceClients, SessionController};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tasks;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_FILTER: &str = "feedchat=info,feedchat_core=info";

#[derive(Parser, Debug)]
#[command(name = "feedchat")]
#[command(version, about = "Terminal client for a photo feed and chat service")]
struct Cli {
    /// Base URL of the feed service
    #[arg(long, env = "FEEDCHAT_FEED_URL")]
    feed_url: Option<String>,

    /// Base URL of the chat service
    #[arg(long, env = "FEEDCHAT_CHAT_URL")]
    chat_url: Option<String>,

    /// File holding the saved session
    #[arg(long, env = "FEEDCHAT_STORE")]
    store: Option<PathBuf>,

    /// Where to write the log (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

fn default_data_path(file: &str) -> Result<PathBuf> {
    let dir = dirs::data_local_dir().context("could not determine data directory")?;
    Ok(dir.join("feedchat").join(file))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Layers command line and environment overrides on top of the config file.
fn effective_config(cli: &Cli) -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read config file, using defaults");
        Config::default()
    });

    if let Some(url) = &cli.feed_url {
        config.feed_url = Some(url.clone());
    }
    if let Some(url) = &cli.chat_url {
        config.chat_url = Some(url.clone());
    }
    if let Some(path) = &cli.store {
        config.store_path = Some(path.clone());
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = Some(secs);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => default_data_path("feedchat.log")?,
    };
    init_logging(&log_path)?;

    let config = effective_config(&cli);

    if cli.save_config {
        let path = config.save()?;
        println!("Saved config to {}", path.display());
        return Ok(());
    }

    let store_path = match &config.store_path {
        Some(path) => path.clone(),
        None => FileStore::default_path()?,
    };
    let store = FileStore::open(&store_path)
        .with_context(|| format!("could not open session store {}", store_path.display()))?;

    let timeout: Duration = config.request_timeout();
    let clients = ServiceClients::connect(config.feed_url(), config.chat_url(), timeout)?;
    info!(
        feed = config.feed_url(),
        chat = config.chat_url(),
        store = %store_path.display(),
        "Starting"
    );

    let session = SessionController::new(CredentialStore::new(store), clients);

    // Install panic hook to restore terminal on crash
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(AppShell::new(session), events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("Exiting");

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.sync_chat_scroll();
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }
    }
    Ok(())
}
