//! Agent command - run a file provider agent

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tailpipe_agent::AgentConfig;

/// Agent command arguments
#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Relay address to register with
    #[arg(short, long, default_value = tailpipe_agent::DEFAULT_RELAY_ADDR)]
    relay: String,

    /// Provider name to register under (default: hostname)
    #[arg(short, long)]
    provider: Option<String>,

    /// Poll interval for follow-mode tails, in milliseconds
    #[arg(long, default_value = "500", value_name = "MS")]
    poll_interval: u64,
}

/// Run the agent command
pub async fn run(args: AgentArgs) -> Result<()> {
    let config = AgentConfig {
        relay: args.relay,
        provider: args.provider,
        poll_interval: Duration::from_millis(args.poll_interval),
    };

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            ctrl_c_cancel.cancel();
        }
    });

    tailpipe_agent::run(config, cancel).await.context("agent failed")
}
