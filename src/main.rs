use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use shipwright::autofix::marker_for;
use shipwright::config::Config;
use shipwright::domain::{Credentials, InboundEvent};
use shipwright::sdm::{self, DeliveryMachine};
use shipwright::status::RecordingStatusReporter;

/// Inbound events buffered between the reader and the dispatcher
const EVENT_BUFFER: usize = 64;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shipwright")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("shipwright.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { events } => handle_run_command(events.as_deref(), config).await,
        Commands::Goals => handle_goals_command(config),
        Commands::Marker { name } => {
            println!("{}", marker_for(name));
            Ok(())
        }
    }
}

/// Read JSON-lines events into the channel; returns how many were sent
async fn feed_events(path: Option<PathBuf>, tx: mpsc::Sender<InboundEvent>) -> Result<usize> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .context(format!("Failed to open events file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut line_no = 0;
    let mut sent = 0;
    while let Some(line) = lines.next_line().await.context("Failed to read events")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: InboundEvent =
            serde_json::from_str(line).context(format!("Invalid event on line {}", line_no))?;
        if tx.send(event).await.is_err() {
            log::warn!("Dispatcher stopped before line {}", line_no);
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

async fn handle_run_command(events: Option<&Path>, config: &Config) -> Result<()> {
    let token = config.github.token();
    let reporter = sdm::status_reporter(config, token.as_deref()).context("Failed to create status reporter")?;
    let provider = sdm::working_copy_provider(config);
    let credentials = Credentials::token(token.unwrap_or_default());
    let machine = DeliveryMachine::from_config(config, provider, reporter, credentials)
        .context("Failed to build delivery machine")?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let reader = tokio::spawn(feed_events(events.map(Path::to_path_buf), tx));
    let summary = machine.run(rx).await;
    let sent = reader.await.context("Event reader panicked")??;

    info!("Dispatched {} inbound events: {}", sent, summary);
    let line = summary.to_string();
    if summary.is_clean() {
        println!("{} {}", "Done:".green(), line);
        Ok(())
    } else {
        println!("{} {}", "Done with failures:".red(), line);
        for error in &summary.errors {
            println!("  {}", error.red());
        }
        eyre::bail!("{} goals failed, {} handler errors", summary.failed, summary.errors.len())
    }
}

fn handle_goals_command(config: &Config) -> Result<()> {
    let machine = DeliveryMachine::from_config(
        config,
        sdm::working_copy_provider(config),
        Arc::new(RecordingStatusReporter::new()),
        Credentials::token(""),
    )
    .context("Invalid configuration")?;

    println!("{}", "Goals:".cyan());
    if config.goals.is_empty() {
        println!("  (none)");
    }
    for goal in &config.goals {
        println!("  {:<20} {:<14} {}", goal.context, goal.kind.label(), goal.description);
    }

    println!("{}", "Phases:".cyan());
    for phases in machine.phases() {
        println!("  {:<20} {}", phases.name, phases.contexts().join(" -> "));
    }

    println!("{}", "Autofixes:".cyan());
    for name in machine.transforms().names() {
        println!("  {:<20} {}", name, marker_for(name).as_str().dimmed());
    }

    println!("{}", "Code reactions:".cyan());
    for registration in machine.reactions().registrations() {
        println!("  {}", registration.name());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
