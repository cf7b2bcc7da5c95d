//! Tailpipe - tail remote files through a relay
//!
//! # Usage
//!
//! ```bash
//! # Run the relay (consumers authenticate with TAILPIPE_TOKEN)
//! TAILPIPE_TOKEN=secret tailpipe relay --listen 0.0.0.0:4447
//!
//! # Run an agent next to the files
//! tailpipe agent --relay relay.example.com:4447
//!
//! # Tail a file on a registered provider
//! TAILPIPE_TOKEN=secret tailpipe tail /var/log/syslog@web-01 --follow
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tailpipe - tail remote files through a relay
#[derive(Parser, Debug)]
#[command(name = "tailpipe")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay
    Relay(cmd::relay::RelayArgs),

    /// Run a file provider agent
    Agent(cmd::agent::AgentArgs),

    /// Tail a file on a registered provider
    Tail(cmd::tail::TailArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Relay(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            cmd::relay::run(args).await
        }
        Command::Agent(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            cmd::agent::run(args).await
        }
        Command::Tail(args) => {
            // Tail prints file content to stdout; keep logging quiet
            init_logging(cli.log_level.as_deref().unwrap_or("warn"))?;
            cmd::tail::run(args).await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
