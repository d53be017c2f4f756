//! Pucktual - browse coffee beans and espresso recipes from the command line.
//!
//! Talks to a self-hosted coffee logging service: set the server URL once,
//! log in (optionally remembering the credentials), then list beans and view
//! the latest recipe and shot history for a bean.

mod commands;
mod prompt;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pucktual_core::{AppContext, Config, CredentialBackend};

#[derive(Debug, Parser)]
#[command(name = "pucktual", version, about = "Browse coffee beans and espresso recipes")]
struct Cli {
    /// Credential storage backend: keyring or file (overrides the config file)
    #[arg(long, global = true, env = "PUCKTUAL_STORE")]
    store: Option<CredentialBackend>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Set the server URL and optionally store login credentials
    Setup {
        /// Base URL of the coffee service, e.g. https://coffee.example.com
        url: String,
        /// Store credentials for this user (prompts for the password)
        #[arg(long)]
        username: Option<String>,
    },
    /// Log in and remember the credentials for automatic login
    Login {
        #[arg(long, env = "PUCKTUAL_USERNAME")]
        username: Option<String>,
    },
    /// Forget the stored token and credentials
    Logout,
    /// Show server, store and session information
    Status,
    /// List all beans
    Beans {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the latest recipe and shot history for a bean
    Extractions {
        bean_id: i64,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// Returns the guard of the file writer; logs are flushed when it drops.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    info!("pucktual starting");

    let config_path = Config::config_path()?;
    let mut config = match Config::load_from(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(backend) = cli.store {
        config.credential_backend = backend;
    }

    let ctx = AppContext::new(config, config_path)?;
    commands::run(&ctx, cli.command).await
}
