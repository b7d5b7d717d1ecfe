//! Distill - CLI entry point
//!
//! Resolves the repository, wires the pipeline, and hands control to the
//! TUI or the headless plain-mode loop.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use distill::agent::script::DEMO_INPUTS;
use distill::cli::Cli;
use distill::events::{EventBus, PipelineEvent, create_event_bus};
use distill::pipeline::{PipelineConfig, PipelineController};
use distill::repo::resolve_repo;
use distill::{ClaudeTurnExecutor, TurnExecutor};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("distill")
        .join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some("INFO") | None => tracing::Level::INFO,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // Logs go to a file so they never corrupt the TUI
    let log_file = fs::File::create(log_dir.join("distill.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let repo = resolve_repo(&cli.repo)
        .await
        .context("Failed to resolve repository")?;
    info!(repo = %repo.path().display(), feature = %cli.feature, "starting");

    let bus = create_event_bus();
    let executor: Arc<dyn TurnExecutor> = {
        let mut executor = ClaudeTurnExecutor::new(Arc::clone(&bus));
        if let Some(binary) = &cli.agent_bin {
            executor = executor.with_binary(binary);
        }
        Arc::new(executor)
    };

    let mut config = PipelineConfig::new(repo.path().to_path_buf(), &cli.feature);
    config.output_path = cli.output.clone();
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }
    if cli.demo {
        config.scripted_inputs = Some(DEMO_INPUTS.iter().map(|s| s.to_string()).collect());
    }

    let controller = Arc::new(PipelineController::new(executor, Arc::clone(&bus), config));

    if cli.plain {
        run_plain(controller, bus).await
    } else {
        distill::tui::run(controller, bus).await
    }
}

/// Headless mode: events to stdout, input from stdin
async fn run_plain(controller: Arc<PipelineController>, bus: Arc<EventBus>) -> Result<()> {
    debug!("run_plain: starting");
    let mut rx = bus.subscribe();

    let mut pipeline = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.start().await })
    };

    let stdin_controller = Arc::clone(&controller);
    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !stdin_controller.submit_input(line) {
                debug!("run_plain: input dropped, no waiter");
            }
        }
    });

    let result = loop {
        tokio::select! {
            event = rx.recv() => {
                if let Ok(event) = event {
                    print_event(&event);
                }
            }
            result = &mut pipeline => {
                break result.context("pipeline task panicked")?;
            }
        }
    };

    // Print anything still buffered when the task finished
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }

    stdin_task.abort();
    if result.success {
        Ok(())
    } else {
        Err(eyre::eyre!(result.error.unwrap_or_else(|| "run failed".to_string())))
    }
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::PhaseChanged { phase } => println!("== phase: {} ==", phase),
        PipelineEvent::Worker { worker } => {
            if let Some(progress) = &worker.progress {
                println!("[{}] {}", worker.kind.display_name(), progress);
            }
        }
        PipelineEvent::Message { message } => {
            println!("{}: {}", message.role.log_label(), message.text);
        }
        PipelineEvent::Activity { text, icon } => println!("{} {}", icon, text),
        PipelineEvent::ToolUsed { tool, detail } => println!("  tool: {} {}", tool, detail),
        PipelineEvent::Error { context, message } => eprintln!("error[{}]: {}", context, message),
        PipelineEvent::Completed { spec_path } => println!("Spec written to {}", spec_path.display()),
    }
}
