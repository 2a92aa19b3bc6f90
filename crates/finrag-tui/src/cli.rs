//! One-shot commands: the same controller as the TUI, printed to stdout.

use anyhow::{bail, Context, Result};
use colored::*;
use finrag_core::controller::{IngestIndicator, UiEvent};
use finrag_core::{execute, Backend, Config, ContextStore, Controller, RequestOutcome};

pub async fn ingest(
    controller: &mut Controller,
    backend: &dyn Backend,
    ticker: &str,
) -> Result<()> {
    let command = controller.submit_ingest(ticker)?;
    println!("📥 {}", controller.indicator().text().cyan());

    let completion = execute(backend, command).await;
    controller.dispatch(completion);

    match controller.indicator() {
        IngestIndicator::Succeeded { ticker, summary } => {
            println!("{} {}", "✓".green().bold(), format!("Ingested {}", ticker).bold());
            if !summary.is_empty() {
                println!("  {}", summary.dimmed());
            }
            println!("  Questions now apply to {}", ticker.bold().yellow());
            Ok(())
        }
        other => bail!("{}", other.text()),
    }
}

pub async fn ask(
    controller: &mut Controller,
    backend: &dyn Backend,
    question: &str,
    ticker: Option<&str>,
) -> Result<()> {
    if let Some(ticker) = ticker {
        controller.inputs_mut().ticker = ticker.to_string();
    }
    let command = controller.submit_query(question)?;
    if let Some(ticker) = controller.view().effective_ticker {
        println!("🔍 Asking about {}...\n", ticker.bold().cyan());
    }

    let completion = execute(backend, command).await;
    let failure = match &completion {
        UiEvent::QueryCompleted {
            outcome: RequestOutcome::Failure(failure),
        } => Some(failure.clone()),
        _ => None,
    };
    controller.dispatch(completion);

    let body = controller
        .log()
        .messages()
        .last()
        .map(|m| m.body.clone())
        .unwrap_or_default();
    if let Some(failure) = failure {
        if failure.is_transport() {
            bail!("{}", body.replace("**", ""));
        }
        bail!("{}", failure.detail().unwrap_or("the server rejected the question"));
    }

    println!("{}", "Answer:".bold().green());
    println!("{}", body);
    if let Some(caption) = controller.view().caption {
        println!("\n{}", caption.dimmed());
    }
    Ok(())
}

pub async fn health(backend: &dyn Backend, api_url: &str) -> Result<()> {
    let health = backend
        .health()
        .await
        .into_result()
        .with_context(|| format!("{} is not healthy", api_url))?;
    println!(
        "{} {} is {} (version {})",
        "✓".green().bold(),
        api_url,
        health.status.bold().green(),
        health.version
    );
    Ok(())
}

pub fn context_show(context: &ContextStore) {
    match context.active_ticker() {
        Some(ticker) => println!("Active company: {}", ticker.bold().yellow()),
        None => println!("{}", "No active company. Run `finrag ingest <TICKER>` first.".dimmed()),
    }
}

pub fn context_set(context: &mut ContextStore, ticker: &str) -> Result<()> {
    let ticker = context.set_active_ticker(ticker)?;
    println!("Active company set to {}", ticker.bold().yellow());
    Ok(())
}

pub fn context_clear(context: &mut ContextStore) {
    context.clear_active_ticker();
    println!("Active company cleared");
}

pub fn config(config: &Config, api_url: &str, init: bool) -> Result<()> {
    let path = Config::config_path()?;
    if init {
        if path.exists() {
            println!("{} already exists", path.display().to_string().yellow());
        } else {
            Config::new().save_to(&path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        return Ok(());
    }

    println!("{}", "Configuration".bold().blue());
    println!("{}", "=".repeat(40).dimmed());
    println!("config file: {}", path.display());
    println!("api url:     {}", api_url);
    match config.state_path() {
        Ok(state) => println!("state file:  {}", state.display()),
        Err(e) => println!("state file:  {}", e.to_string().red()),
    }
    println!("log level:   {}", config.log_level());
    println!("suggestions:");
    for (i, suggestion) in config.suggestions().iter().enumerate() {
        println!("  {}. {}", (i + 1).to_string().bold(), suggestion);
    }
    Ok(())
}
