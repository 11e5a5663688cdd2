//! Daystar CLI - sign in and manage habits from a terminal.
//!
//! All session and synchronization behavior lives in `daystar-core`; this
//! binary only parses arguments, prompts for secrets, and prints results.

mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daystar_core::{ApiClient, Config, CredentialStore, HabitSyncController, SessionManager};

use commands::Cli;

/// Initialize tracing with a daily-rolling log file under the app data
/// directory. Stdout stays reserved for command output.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = Config::data_dir()?.join("logs");
    let appender = tracing_appender::rolling::daily(log_dir, "daystar.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing()?;
    info!("Daystar CLI starting");

    let mut config = Config::load()?;
    let store = Arc::new(CredentialStore::open(&Config::data_dir()?));
    let api = Arc::new(ApiClient::new(&config.api_base_url, Arc::clone(&store))?);

    let session = SessionManager::new(Arc::clone(&api), store);
    session.bootstrap().await;
    let sync = HabitSyncController::new(api, session.subscribe());

    commands::run(cli.command, &mut config, &session, &sync).await
}
