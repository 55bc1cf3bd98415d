//! EduQA Campus - a command line client for the campus Q&A forum.
//!
//! Each invocation restores the stored session, verifies it against the
//! server and then runs one command. Commands behind a protected route
//! offer to sign in first.

mod app;
mod commands;
mod prompt;
mod render;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "eduqa", version, about = "Ask, answer and follow questions on EduQA Campus")]
pub struct Cli {
    /// API base URL, e.g. https://qa.campus.edu/api
    #[arg(long, global = true, env = "EDUQA_API_URL")]
    api_url: Option<String>,

    /// Credential backend: file or keyring
    #[arg(long, global = true, env = "EDUQA_STORAGE")]
    storage: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true, env = "EDUQA_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (warn by default). The returned guard
/// flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "eduqa.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("EduQA client starting");

    let result = match App::new(cli.api_url, cli.storage, cli.json) {
        Ok(app) => commands::run(&app, cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("EduQA client finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
