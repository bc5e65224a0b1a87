//! ollamastream - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ollamastream::cli::{Args, Commands, Verbosity};
use ollamastream::types::{format_size, GenerateRequest, PullStatus};
use ollamastream::{CallbackClient, Config, OllamaClient, StreamError};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    let config = load_config(&args)?;

    let service = Arc::new(OllamaClient::from_config(&config)?);
    let client = CallbackClient::new(Arc::clone(&service))?
        .with_default_model(config.ollama.default_model.clone());

    if !matches!(args.command, Commands::Config) && !service.health_check().await? {
        eprintln!(
            "{} Ollama is not reachable at {}. Start it with: ollama serve",
            "Error:".red().bold(),
            service.base_url()
        );
        std::process::exit(1);
    }

    let outcome = match &args.command {
        Commands::Pull { name } => pull(&client, name).await,
        Commands::Delete { name } => delete(&client, name).await,
        Commands::Generate { prompt, system } => generate(&client, prompt, system.as_deref()).await,
        Commands::Chat { system } => chat(&client, system.as_deref()).await,
        Commands::Config => show_config(&config),
    };

    match outcome {
        Err(e) if is_cancelled(&e) => {
            eprintln!("\n{}", "Cancelled".yellow());
            Ok(())
        }
        other => other,
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration and apply command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone())?;

    if let Some(host) = &args.host {
        config.ollama.host = host.clone();
    }
    if let Some(port) = args.port {
        config.ollama.port = port;
    }
    if let Some(model) = &args.model {
        config.ollama.default_model = model.clone();
    }

    config.validate()?;
    Ok(config)
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StreamError>()
        .map(StreamError::is_cancelled)
        .unwrap_or(false)
}

/// Token cancelled on the next Ctrl-C
fn cancel_on_ctrl_c() -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    (cancel, watcher)
}

async fn pull(client: &CallbackClient<OllamaClient>, name: &str) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:30} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let (cancel, watcher) = cancel_on_ctrl_c();
    let task = client.pull_model(
        name,
        move |status: &PullStatus| {
            match (status.completed, status.total) {
                (Some(completed), Some(total)) => {
                    bar.set_length(total);
                    bar.set_position(completed);
                }
                _ => bar.tick(),
            }
            bar.set_message(status.status.clone());
            Ok(())
        },
        &cancel,
    );

    let result = task.await;
    watcher.abort();
    let statuses = result?;

    pb.finish_and_clear();
    let downloaded: u64 = statuses.iter().filter_map(|s| s.total).max().unwrap_or(0);
    match statuses.last() {
        Some(last) if last.is_success() => println!(
            "{} Pulled {} ({} largest layer, {} status updates)",
            "✓".green(),
            name.bold(),
            format_size(downloaded),
            statuses.len()
        ),
        Some(last) => println!("{} Pull ended with status: {}", "!".yellow(), last),
        None => println!("{} Server sent no progress for {}", "!".yellow(), name),
    }
    Ok(())
}

async fn delete(client: &CallbackClient<OllamaClient>, name: &str) -> Result<()> {
    let (cancel, watcher) = cancel_on_ctrl_c();
    let result = client.delete_model(name, &cancel).await;
    watcher.abort();

    result?;
    println!("{} Deleted {}", "✓".green(), name.bold());
    Ok(())
}

fn print_fragment(fragment: &String) -> ollamastream::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(fragment.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn generate(client: &CallbackClient<OllamaClient>, prompt: &str, system: Option<&str>) -> Result<()> {
    let mut request = GenerateRequest::new(client.default_model(), prompt);
    if let Some(system) = system {
        request = request.with_system(system);
    }

    let (cancel, watcher) = cancel_on_ctrl_c();
    let result = client.generate(request, print_fragment, &cancel).await;
    watcher.abort();

    let fragments = result?;
    println!();
    tracing::debug!(fragments = fragments.len(), "generation complete");
    Ok(())
}

async fn chat(client: &CallbackClient<OllamaClient>, system: Option<&str>) -> Result<()> {
    let mut session = client.chat_session();
    if let Some(system) = system {
        session = session.with_system(system);
    }

    println!(
        "{} chatting with {} (/clear resets history, /exit quits, Ctrl-C stops a reply)",
        "ollamastream".cyan().bold(),
        session.model().bold()
    );

    let mut editor = rustyline::DefaultEditor::new()?;
    loop {
        let line = match editor.readline(&format!("{} ", ">".green())) {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear().await;
                println!("{}", "History cleared".dimmed());
                continue;
            }
            _ => {}
        }
        let _ = editor.add_history_entry(line);

        let (cancel, watcher) = cancel_on_ctrl_c();
        let task = client
            .send_message(&session, line, Vec::new(), print_fragment, &cancel)
            .await;
        let result = task.await;
        watcher.abort();
        println!();

        match result {
            Ok(_) => {}
            Err(StreamError::Cancelled) => println!("{}", "(reply cancelled)".yellow()),
            Err(e) => println!("{} {}", "Error:".red().bold(), e),
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Configuration".cyan().bold());
    if let Some(path) = Config::default_path() {
        println!("  file:  {}", path.display());
    }
    println!("  url:   {}", config.ollama_url());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
