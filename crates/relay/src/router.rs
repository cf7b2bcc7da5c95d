//! Request router - drives one tail call end-to-end
//!
//! Authenticates the caller, resolves the named provider session, allocates
//! a correlation key, sends the request through the session and relays the
//! answering lines to the consumer until the EOF marker, the consumer's
//! cancellation, or the session's teardown - whichever comes first.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use tailpipe_proto::{Line, TailCall, TailRequest};

use crate::config::Secret;
use crate::error::{RelayError, Result};
use crate::registry::ProviderRegistry;

/// Destination for the lines of one tail call
///
/// The relay server implements this over the consumer's socket; tests
/// implement it over a buffer. A delivery failure is fatal for the call.
#[async_trait]
pub trait LineSink: Send {
    /// Deliver one line of file content to the consumer
    async fn deliver(&mut self, text: &str) -> io::Result<()>;
}

/// Routes tail calls to provider sessions
pub struct RequestRouter {
    registry: Arc<ProviderRegistry>,
    secret: Secret,
    /// Capacity of the per-call line delivery channel
    line_buffer: usize,
}

impl RequestRouter {
    /// Create a router over a registry
    pub fn new(registry: Arc<ProviderRegistry>, secret: Secret, line_buffer: usize) -> Self {
        Self {
            registry,
            secret,
            line_buffer,
        }
    }

    /// The registry this router resolves providers against
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Handle one tail call end-to-end
    ///
    /// Streams lines into `sink` until the provider's EOF marker. `cancel`
    /// carries the consumer's deadline or disconnect; firing it ends the
    /// call with `Cancelled` without affecting the session or other calls.
    pub async fn tail<S: LineSink>(
        &self,
        call: &TailCall,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<()> {
        // Authentication comes before any provider is contacted
        if !self.secret.verify(&call.token) {
            return Err(RelayError::Authentication);
        }

        let session = self.registry.get(&call.provider)?;

        let key = Uuid::new_v4().to_string();
        let (line_tx, line_rx) = mpsc::channel(self.line_buffer);
        session.add_callback(&key, line_tx)?;

        debug!(
            provider = %call.provider,
            path = %call.path,
            key = %key,
            "forwarding tail request"
        );

        let request = TailRequest {
            key: key.clone(),
            path: call.path.clone(),
            last_n: call.last_n,
            follow: call.follow,
        };
        if let Err(e) = session.send(request) {
            session.remove_callback(&key);
            return Err(e);
        }

        let result = relay_lines(line_rx, cancel, sink).await;

        // Normal completion already removed the callback; every other exit
        // path must not leave it behind, and the provider is told to stop
        // tailing for the abandoned key
        session.remove_callback(&key);
        if result.is_err() {
            session.cancel(&key);
        }
        result
    }
}

/// Relay lines from the callback channel to the consumer sink
async fn relay_lines<S: LineSink>(
    mut line_rx: mpsc::Receiver<Line>,
    cancel: &CancellationToken,
    sink: &mut S,
) -> Result<()> {
    loop {
        tokio::select! {
            line = line_rx.recv() => match line {
                // Channel closed without EOF: the session was torn down
                None => return Err(RelayError::Cancelled),
                Some(line) if line.eof => return Ok(()),
                Some(line) => sink.deliver(&line.text).await.map_err(RelayError::Io)?,
            },
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
        }
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
