use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

mod api;
mod app;
mod config;
mod handler;
mod markup;
mod tui;
mod ui;

use api::{DocubotClient, Level, DEFAULT_SERVER_URL, DEFAULT_TOP_K};
use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "docubot")]
#[command(version)]
#[command(about = "Terminal chat client for the Docubot documentation assistant")]
struct Cli {
    /// Base URL of the Docubot server
    #[arg(long)]
    server: Option<String>,

    /// Initial response detail level (beginner, intermediate, expert)
    #[arg(long)]
    level: Option<String>,

    /// Initial number of retrieved chunks backing each answer (1-10)
    #[arg(long)]
    top_k: Option<u8>,

    /// Append tracing output to this file (the terminal owns the screen)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_tracing(path)?;
    }

    let config = Config::load().unwrap_or_else(|_| Config::new());

    let server_url = cli
        .server
        .or(config.server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    // Unknown level names fall back to beginner, as the backend would
    let level = cli
        .level
        .as_deref()
        .or(config.default_level.as_deref())
        .and_then(Level::from_str)
        .unwrap_or(Level::Beginner);

    let top_k = cli
        .top_k
        .or(config.default_top_k)
        .map(api::clamp_top_k)
        .unwrap_or(DEFAULT_TOP_K);

    tracing::info!("starting against {}", server_url);

    let mut app = App::new(DocubotClient::new(&server_url), level, top_k);
    app.start_health_check();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

fn init_tracing(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docubot=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
