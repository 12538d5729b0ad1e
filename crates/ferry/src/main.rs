//! Ferry - stream processing with at-least-once delivery
//!
//! # Usage
//!
//! ```bash
//! # Run a stream
//! ferry run --config ferry.toml
//!
//! # Run and hot-swap the input when the config file changes
//! ferry run --config ferry.toml --watch
//!
//! # Check a config file
//! ferry lint --config ferry.toml
//! ```

mod cmd;
mod stream;
mod watcher;

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ferry_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Ferry - stream processing with at-least-once delivery
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a stream
    Run(cmd::run::RunArgs),

    /// Validate a config file
    Lint(cmd::lint::LintArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = Config::from_file(&args.config).context("failed to load configuration")?;
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::run::run(args, config).await
        }
        Command::Lint(args) => cmd::lint::run(args),
    }
}

/// Initialize the tracing subscriber
///
/// Level: CLI flag > `[log] level` > "info".
fn init_logging(config: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let level = cli_level.unwrap_or(config.level.as_str());
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_target(true).with_thread_ids(false);

    match (config.format, config.output) {
        (LogFormat::Console, LogOutput::Stderr) => {
            registry.with(layer.with_writer(io::stderr)).init()
        }
        (LogFormat::Console, LogOutput::Stdout) => {
            registry.with(layer.with_writer(io::stdout)).init()
        }
        (LogFormat::Json, LogOutput::Stderr) => {
            registry.with(layer.json().with_writer(io::stderr)).init()
        }
        (LogFormat::Json, LogOutput::Stdout) => {
            registry.with(layer.json().with_writer(io::stdout)).init()
        }
    }

    Ok(())
}
