//! Tail command - tail a file on a registered provider
//!
//! Connects to the relay, issues one tail call and prints the received
//! lines to stdout until the file's end (or indefinitely with --follow).

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use tokio::net::TcpStream;
use tokio::time::timeout;

use tailpipe_proto::{Frame, FrameReader, TailCall, write_frame};

/// Tail command arguments
#[derive(Args, Debug)]
pub struct TailArgs {
    /// File and provider, as path@provider (e.g. /var/log/syslog@web-01)
    #[arg(value_name = "PATH@PROVIDER")]
    target: String,

    /// Relay address
    #[arg(short, long, default_value = "127.0.0.1:4447")]
    relay: String,

    /// Give up after this many seconds (default: wait indefinitely)
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print only the last N lines (0 = whole file)
    #[arg(short, long, default_value = "0", value_name = "N")]
    last: u32,

    /// Keep following the file as it grows
    #[arg(short, long)]
    follow: bool,

    /// Authentication token
    #[arg(long, env = "TAILPIPE_TOKEN", hide_env_values = true)]
    token: String,
}

/// Run the tail command
pub async fn run(args: TailArgs) -> Result<()> {
    let (path, provider) = parse_target(&args.target)?;

    let call = TailCall {
        token: args.token.clone(),
        provider: provider.to_string(),
        path: path.to_string(),
        last_n: args.last,
        follow: args.follow,
    };

    let tail = stream_lines(&args.relay, call);
    match args.timeout {
        Some(secs) => timeout(Duration::from_secs(secs), tail)
            .await
            .map_err(|_| anyhow!("timed out after {secs}s"))?,
        None => tail.await,
    }
}

/// Split a path@provider target
fn parse_target(target: &str) -> Result<(&str, &str)> {
    match target.rsplit_once('@') {
        Some((path, provider)) if !path.is_empty() && !provider.is_empty() => {
            Ok((path, provider))
        }
        _ => bail!("invalid target {target:?}, expected path@provider"),
    }
}

/// Issue the call and print lines until the stream ends
async fn stream_lines(relay: &str, call: TailCall) -> Result<()> {
    let mut stream = TcpStream::connect(relay)
        .await
        .with_context(|| format!("failed to connect to relay at {relay}"))?;
    write_frame(&mut stream, &Frame::Tail(call))
        .await
        .context("failed to send tail call")?;

    let mut reader = FrameReader::new(stream);
    loop {
        match reader.read_frame().await.context("failed to read from relay")? {
            Some(Frame::Text(text)) => println!("{text}"),
            Some(Frame::End) => return Ok(()),
            Some(Frame::Error(message)) => bail!("tail failed: {message}"),
            Some(other) => bail!("unexpected {} frame from relay", other.kind()),
            None => bail!("relay closed the connection"),
        }
    }
}
