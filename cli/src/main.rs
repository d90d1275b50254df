//! CLI entrypoint for polybot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod chat;
mod cli;

use anyhow::{Context, Result, bail};
use chat::ChatSession;
use clap::Parser;
use cli::Cli;
use polybot_application::{
    ChatEngine, ConversationLogger, FallbackScheduler, NoConversationLogger, Orchestrator,
};
use polybot_domain::{Conversation, ParticipantId};
use polybot_infrastructure::{
    ConfigLoader, HttpCompletionService, InMemoryConversationStore, JsonlConversationLogger,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_ref().or(config.logging.dir.as_ref()));

    info!("Starting polybot");

    let orchestrator_config = config.orchestrator_config()?;
    let new_conversation = config.new_conversation()?;

    let logger: Arc<dyn ConversationLogger> =
        match cli.transcript_dir.as_ref().or(config.logging.transcript_dir.as_ref()) {
            Some(dir) => {
                let logger = JsonlConversationLogger::daily_in(dir)
                    .with_context(|| format!("Failed to open transcript in {}", dir.display()))?;
                info!("Writing transcript to {}", logger.path().display());
                Arc::new(logger)
            }
            None => Arc::new(NoConversationLogger),
        };

    // === Dependency Injection ===
    let api_key = config.completion.api_key();
    if api_key.is_none() {
        warn!(
            "No API key found; set {} or completion.api_key",
            config.completion.api_key_env()
        );
    }
    let completion = HttpCompletionService::new(config.completion.base_url(), api_key)
        .with_conversation_logger(logger.clone());
    info!("Completion endpoint: {}", completion.endpoint());

    let store = Arc::new(InMemoryConversationStore::new());
    let conversation = store.create_conversation(new_conversation)?;
    let speaker = pick_speaker(&conversation, cli.speaker.as_deref())?;

    let (scheduler, fires) = FallbackScheduler::new();
    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(completion),
        Arc::new(scheduler),
        orchestrator_config,
    )
    .with_conversation_logger(logger);
    let orchestrator = Arc::new(orchestrator);
    let engine = Arc::new(ChatEngine::new(Arc::clone(&orchestrator)));

    let shutdown = CancellationToken::new();
    let (events, event_rx) = mpsc::channel(EVENT_BUFFER);
    let engine_task = tokio::spawn(engine.run(event_rx, fires, shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("^C");
                shutdown.cancel();
            }
        });
    }

    let mut session = ChatSession::new(store, events, conversation, speaker);
    if config.conversation.form_memories {
        session = session.with_memories(orchestrator);
    }
    let result = session.run(shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = engine_task.await {
        warn!("Chat engine task failed: {}", e);
    }
    result
}

/// Stderr logging by verbosity, plus a daily rolling file when `log_dir` is set.
fn init_logging(verbose: u8, log_dir: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "polybot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// The human typing in this terminal: `--as` when given, else the first human.
fn pick_speaker(conversation: &Conversation, name: Option<&str>) -> Result<ParticipantId> {
    let mut humans = conversation.humans();
    let found = match name {
        Some(name) => humans.find(|p| p.name().eq_ignore_ascii_case(name.trim())),
        None => humans.next(),
    };
    match (found, name) {
        (Some(participant), _) => Ok(participant.id),
        (None, Some(name)) => bail!(
            "'{}' is not a human participant (configured: {})",
            name,
            conversation.human_names().join(", ")
        ),
        (None, None) => bail!("No human participants configured"),
    }
}
