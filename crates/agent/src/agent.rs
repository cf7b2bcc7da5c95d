//! Agent connection loop
//!
//! Connects to the relay, registers under the provider name, then serves
//! forwarded tail requests. Each request runs as its own task; all of their
//! line frames are serialized onto the relay stream through one writer. A
//! `Cancel` frame from the relay stops the matching task, so a follow tail
//! whose consumer went away does not keep polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use tailpipe_proto::{Frame, FrameReader, Line, ProtoError, write_frame};

use crate::error::{AgentError, Result};
use crate::tailer::tail_file;

/// Default relay address
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:4447";

/// Capacity of the shared outbound line queue
const LINE_QUEUE_CAPACITY: usize = 256;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Relay address (host:port)
    pub relay: String,
    /// Provider name to register under (default: hostname)
    pub provider: Option<String>,
    /// Poll interval for follow-mode tails
    pub poll_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relay: DEFAULT_RELAY_ADDR.into(),
            provider: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Run the agent until the relay connection ends or `cancel` fires
pub async fn run(config: AgentConfig, cancel: CancellationToken) -> Result<()> {
    let provider = match &config.provider {
        Some(name) => name.clone(),
        None => hostname::get()?.to_string_lossy().into_owned(),
    };

    let stream = TcpStream::connect(&config.relay).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_frame(&mut write_half, &Frame::Register(provider.clone())).await?;
    info!(relay = %config.relay, provider = %provider, "registered with relay");

    // One writer serializes the line frames of all concurrent tails
    let (line_tx, mut line_rx) = mpsc::channel::<Line>(LINE_QUEUE_CAPACITY);
    let mut writer = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &Frame::Line(line)).await {
                warn!(error = %e, "send to relay failed");
                return;
            }
        }
    });

    let mut reader = FrameReader::new(read_half);
    serve(&mut reader, &line_tx, &mut writer, &config, &cancel).await
}

async fn serve(
    reader: &mut FrameReader<tokio::net::tcp::OwnedReadHalf>,
    line_tx: &mpsc::Sender<Line>,
    writer: &mut tokio::task::JoinHandle<()>,
    config: &AgentConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    // Running tails by correlation key, so relay-side cancels reach them
    let tails: Arc<Mutex<HashMap<String, CancellationToken>>> =
        Arc::new(Mutex::new(HashMap::new()));

    loop {
        tokio::select! {
            frame = reader.read_frame() => match frame? {
                Some(Frame::Request(request)) => {
                    info!(path = %request.path, key = %request.key, "tail request received");
                    let token = cancel.child_token();
                    tails.lock().insert(request.key.clone(), token.clone());

                    let tails = Arc::clone(&tails);
                    let line_tx = line_tx.clone();
                    let key = request.key.clone();
                    let poll_interval = config.poll_interval;
                    tokio::spawn(async move {
                        tail_file(request, line_tx, token, poll_interval).await;
                        tails.lock().remove(&key);
                    });
                }
                Some(Frame::Cancel(key)) => {
                    if let Some(token) = tails.lock().remove(&key) {
                        info!(key = %key, "tail cancelled by relay");
                        token.cancel();
                    }
                }
                Some(Frame::Heartbeat) => trace!("heartbeat from relay"),
                Some(other) => {
                    return Err(ProtoError::Malformed(format!(
                        "unexpected {} frame from relay",
                        other.kind()
                    ))
                    .into());
                }
                None => return Err(AgentError::RelayClosed),
            },
            // Writer ending means a failed send; the relay is gone
            _ = &mut *writer => return Err(AgentError::RelayClosed),
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}
