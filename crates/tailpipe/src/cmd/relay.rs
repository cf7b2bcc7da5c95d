//! Relay command - run the relay server

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tailpipe_relay::{DEFAULT_LISTEN_ADDR, RelayConfig, RelayServer, Secret};

/// Relay command arguments
#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Listen address
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    listen: String,

    /// Shared secret tail clients must present
    #[arg(long, env = "TAILPIPE_TOKEN", hide_env_values = true)]
    token: String,
}

/// Run the relay command
pub async fn run(args: RelayArgs) -> Result<()> {
    let config = RelayConfig::default().with_listen(args.listen);
    let server = RelayServer::new(config, Secret::new(args.token));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            ctrl_c_cancel.cancel();
        }
    });

    server.run(cancel).await.context("relay server failed")
}
