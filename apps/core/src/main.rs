// Lesson tutor backend entry point
// Wires the actors, the session store and the HTTP API together.

mod actors;
mod agent;
mod brain;
mod config;
mod database;
mod error;
mod fs_manager;
mod http;
mod indexer;
mod models;
mod preflight;
mod rate_limiter;
mod retriever;
mod session;
mod state;
mod text_extract;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use actors::llm::LlmActorHandle;
use actors::rag::RagActorHandle;
use actors::supervisor::SupervisorHandle;
use config::{AppConfig, LogFormat};
use fs_manager::DataLayout;
use indexer::Indexer;
use session::{MemorySessionStore, SessionStore};
use state::AppState;

#[derive(Parser)]
#[command(name = "lesson-tutor", version, about = "Maths lesson tutoring backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Listen address, overrides TUTOR_BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Index every transcript in the data directory
    BuildIndex {
        /// Add to the existing index instead of rebuilding it
        #[arg(long)]
        append: bool,
    },
    /// Run the startup checks and print the report
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging(LogFormat::from_env());

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, bind).await,
        Command::BuildIndex { append } => build_index(config, append).await,
        Command::Check { json } => check(config, json).await,
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
        LogFormat::Json => registry
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new("lesson-tutor".to_string(), std::io::stdout))
            .init(),
    }
}

async fn serve(config: AppConfig, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let layout = DataLayout::new(&config.data_dir);
    layout.init().context("Failed to create data directories")?;

    let report = preflight::run_preflight_checks(&config).await;
    if !report.ready_to_start {
        anyhow::bail!("{}", report.summary);
    }

    let sessions: Arc<dyn SessionStore> = match &config.session_db {
        Some(path) => {
            let pool = database::init_db(path)
                .await
                .with_context(|| format!("Failed to open session database {:?}", path))?;
            Arc::new(database::SqliteSessionStore::new(pool))
        }
        None => Arc::new(MemorySessionStore::new()),
    };

    let llm = Arc::new(LlmActorHandle::new(&config));
    let rag = Arc::new(RagActorHandle::new(layout.vectors_dir(), layout.models_dir()));
    let supervisor = SupervisorHandle::new(llm, rag, sessions, config.models.clone(), config.pipeline);

    let state = Arc::new(AppState::new(supervisor.clone(), layout.transcripts_dir()));
    let router = http::create_router(state);

    let addr = bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    supervisor.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn build_index(config: AppConfig, append: bool) -> anyhow::Result<()> {
    let layout = DataLayout::new(&config.data_dir);
    layout.init().context("Failed to create data directories")?;

    let rag = Arc::new(RagActorHandle::new(layout.vectors_dir(), layout.models_dir()));
    let report = Indexer::new(rag)?
        .build(&layout.transcripts_dir(), !append)
        .await
        .context("Index build failed")?;

    println!(
        "Indexed {} file(s), {} chunk(s); {} file(s) failed",
        report.files_indexed, report.chunks, report.files_failed
    );
    if report.files_indexed == 0 {
        anyhow::bail!("No transcripts were indexed from {:?}", layout.transcripts_dir());
    }
    Ok(())
}

async fn check(config: AppConfig, json: bool) -> anyhow::Result<()> {
    let report = preflight::run_preflight_checks(&config).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }
    if !report.ready_to_start {
        anyhow::bail!("{}", report.summary);
    }
    Ok(())
}
