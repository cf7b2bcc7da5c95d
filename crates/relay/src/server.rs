//! TCP server for the relay
//!
//! Accepts both kinds of connection on one listener; the first frame
//! classifies the peer. A `Register` frame turns the connection into a
//! provider session (forwarding loop + dispatch loop over the same
//! stream); a `Tail` frame drives one consumer call through the router.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tailpipe_proto::{Frame, FrameReader, ProtoError, TailCall, write_frame};

use crate::config::{RelayConfig, Secret};
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::router::{LineSink, RequestRouter};
use crate::session::{ProviderCommand, ProviderSession};

/// The relay server
pub struct RelayServer {
    config: RelayConfig,
    registry: Arc<ProviderRegistry>,
    router: Arc<RequestRouter>,
}

impl RelayServer {
    /// Create a relay server
    pub fn new(config: RelayConfig, secret: Secret) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        let router = Arc::new(RequestRouter::new(
            Arc::clone(&registry),
            secret,
            config.line_buffer_capacity,
        ));
        Self {
            config,
            registry,
            router,
        }
    }

    /// The provider registry
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Bind the configured address and serve until cancelled
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        info!(addr = %listener.local_addr()?, "relay listening");
        self.serve(listener, cancel).await
    }

    /// Serve connections from an already-bound listener until cancelled
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(peer = %addr, "connection accepted");
                        let registry = Arc::clone(&self.registry);
                        let router = Arc::clone(&self.router);
                        let config = self.config.clone();

                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, registry, router, config).await {
                                debug!(peer = %addr, error = %e, "connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                },
                _ = cancel.cancelled() => {
                    info!("relay shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Classify and handle one connection
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<ProviderRegistry>,
    router: Arc<RequestRouter>,
    config: RelayConfig,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    match reader.read_frame().await? {
        Some(Frame::Register(provider)) => {
            serve_provider(provider, reader, write_half, registry, &config).await
        }
        Some(Frame::Tail(call)) => {
            serve_consumer(call, reader, write_half, router).await
        }
        Some(other) => {
            let message = format!("expected register or tail frame, got {}", other.kind());
            let _ = write_frame(&mut write_half, &Frame::Error(message.clone())).await;
            Err(ProtoError::Malformed(message).into())
        }
        // Peer closed before the handshake
        None => Ok(()),
    }
}

// ============================================================================
// Provider leg
// ============================================================================

/// Run one provider connection until it ends, then tear the session down
async fn serve_provider(
    provider: String,
    reader: FrameReader<OwnedReadHalf>,
    write_half: OwnedWriteHalf,
    registry: Arc<ProviderRegistry>,
    config: &RelayConfig,
) -> Result<()> {
    let (session, command_rx) = ProviderSession::new(&provider, config.request_queue_capacity);

    // Replace, never queue: a re-registration under a live name displaces
    // the old session and cancels its in-flight calls
    if let Some(old) = registry.put(&provider, Arc::clone(&session)) {
        warn!(provider = %provider, "replacing existing registration");
        old.shutdown();
    }
    info!(provider = %provider, "provider registered");

    let result = tokio::select! {
        r = forward_commands(write_half, command_rx, config.heartbeat_interval) => r,
        r = dispatch_lines(reader, &session) => r,
    };

    // Either loop ending is fatal for the whole session; pending calls are
    // cancelled and the name becomes unknown again
    session.shutdown();
    registry.remove(&provider, &session);
    info!(provider = %provider, "provider disconnected");

    result
}

/// Forwarding loop: drain the command queue onto the provider's stream
///
/// Also emits periodic heartbeats; a failed write means the provider is
/// presumed disconnected and ends the session.
async fn forward_commands(
    mut writer: OwnedWriteHalf,
    mut commands: mpsc::Receiver<ProviderCommand>,
    heartbeat_interval: Duration,
) -> Result<()> {
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ProviderCommand::Request(request)) => {
                    debug!(path = %request.path, key = %request.key, "request forwarded to provider");
                    write_frame(&mut writer, &Frame::Request(request)).await?;
                }
                Some(ProviderCommand::Cancel(key)) => {
                    debug!(key = %key, "cancel forwarded to provider");
                    write_frame(&mut writer, &Frame::Cancel(key)).await?;
                }
                None => return Ok(()),
            },
            _ = heartbeat.tick() => {
                write_frame(&mut writer, &Frame::Heartbeat).await?;
            }
        }
    }
}

/// Dispatch loop: the sole reader of the provider's inbound stream
async fn dispatch_lines(
    mut reader: FrameReader<OwnedReadHalf>,
    session: &ProviderSession,
) -> Result<()> {
    loop {
        match reader.read_frame().await? {
            Some(Frame::Line(line)) => session.dispatch(line).await,
            Some(other) => {
                return Err(ProtoError::Malformed(format!(
                    "unexpected {} frame from provider",
                    other.kind()
                ))
                .into());
            }
            None => return Ok(()),
        }
    }
}

// ============================================================================
// Consumer leg
// ============================================================================

/// Run one consumer tail call
async fn serve_consumer(
    call: TailCall,
    mut reader: FrameReader<OwnedReadHalf>,
    write_half: OwnedWriteHalf,
    router: Arc<RequestRouter>,
) -> Result<()> {
    info!(provider = %call.provider, path = %call.path, "tail call");

    // The consumer sends nothing after the call; any read result means it
    // went away and the call should be cancelled
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let _ = reader.read_frame().await;
            cancel.cancel();
        }
    });

    let mut sink = SocketSink { writer: write_half };
    let result = router.tail(&call, &cancel, &mut sink).await;
    watcher.abort();

    match &result {
        Ok(()) => {
            let _ = write_frame(&mut sink.writer, &Frame::End).await;
            info!(provider = %call.provider, path = %call.path, "tail complete");
        }
        Err(e) => {
            let _ = write_frame(&mut sink.writer, &Frame::Error(e.to_string())).await;
            debug!(provider = %call.provider, path = %call.path, error = %e, "tail failed");
        }
    }

    result
}

/// `LineSink` over the consumer's socket
struct SocketSink<W> {
    writer: W,
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LineSink for SocketSink<W> {
    async fn deliver(&mut self, text: &str) -> io::Result<()> {
        write_frame(&mut self.writer, &Frame::Text(text.to_string()))
            .await
            .map_err(|e| match e {
                ProtoError::Io(e) => e,
                other => io::Error::other(other),
            })
    }
}
