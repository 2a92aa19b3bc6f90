use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finrag_core::{Backend, Config, ContextStore, Controller, FileStore, HttpBackend};
use tracing::{info, warn};

mod app;
mod cli;
mod handler;
#[cfg(test)]
mod test_support;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "finrag", version)]
#[command(about = "Ask questions about a company's financial statements")]
struct Cli {
    /// Base URL of the Q&A backend
    #[arg(long, env = "FINRAG_API_URL", global = true)]
    api_url: Option<String>,

    /// Keep the active company in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a company's financial statements
    Ingest {
        /// Ticker symbol, e.g. AAPL or INFY.NS
        ticker: String,
    },
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Company to ask about instead of the active one
        #[arg(short, long)]
        ticker: Option<String>,
    },
    /// Check that the backend is reachable
    Health,
    /// Show or change the active company
    Context {
        #[command(subcommand)]
        action: Option<ContextAction>,
    },
    /// Print the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum ContextAction {
    Show,
    Set { ticker: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    if let Err(e) = init_logging(config.log_level()) {
        eprintln!("warning: logging disabled: {:#}", e);
    }
    if let Err(e) = &loaded {
        warn!(error = %e, "using default configuration");
    }

    let api_url = config.api_url(cli.api_url.as_deref());
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&api_url));
    info!(%api_url, "finrag starting");

    let context = if cli.ephemeral {
        ContextStore::in_memory()
    } else {
        let path = config.state_path()?;
        ContextStore::new(Box::new(FileStore::open(path)))
    };

    match cli.command {
        None => {
            let controller = Controller::new(context, config.suggestions());
            run_tui(controller, backend, api_url).await?
        }
        Some(Commands::Ingest { ticker }) => {
            let mut controller = Controller::new(context, config.suggestions());
            cli::ingest(&mut controller, backend.as_ref(), &ticker).await?
        }
        Some(Commands::Ask { question, ticker }) => {
            let mut controller = Controller::new(context, config.suggestions());
            cli::ask(&mut controller, backend.as_ref(), &question, ticker.as_deref()).await?
        }
        Some(Commands::Health) => cli::health(backend.as_ref(), &api_url).await?,
        Some(Commands::Context { action }) => {
            let mut context = context;
            match action.unwrap_or(ContextAction::Show) {
                ContextAction::Show => cli::context_show(&context),
                ContextAction::Set { ticker } => cli::context_set(&mut context, &ticker)?,
                ContextAction::Clear => cli::context_clear(&mut context),
            }
        }
        Some(Commands::Config { init }) => cli::config(&config, &api_url, init)?,
    }

    Ok(())
}

/// Send `tracing` output to a log file so it never draws over the TUI.
fn init_logging(level: &str) -> Result<()> {
    let log_path = Config::log_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}

async fn run_tui(controller: Controller, backend: Arc<dyn Backend>, api_url: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(controller, backend, api_url, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    info!("finrag exiting");
    Ok(())
}
