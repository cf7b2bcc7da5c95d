//! Provider session - one per live agent connection
//!
//! A session owns the relay-side state for one provider: the outbound
//! command queue drained by that connection's forwarding loop, and the map
//! from correlation key to the callback channel of the tail call waiting on
//! that key. Many concurrent tail calls multiplex over the one connection;
//! the connection's single dispatch loop feeds each incoming line to the
//! callback registered under its key.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use tailpipe_proto::{Line, TailRequest};

use crate::error::{RelayError, Result};

/// What the forwarding loop writes to the provider's stream
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    /// Forward a tail request
    Request(TailRequest),
    /// Tell the provider nobody is waiting on this key anymore
    Cancel(String),
}

/// Relay-side representative of one provider connection
#[derive(Debug)]
pub struct ProviderSession {
    /// Provider name this session was registered under
    name: String,
    /// Outbound command queue, drained by the connection's forwarding loop
    outbound: mpsc::Sender<ProviderCommand>,
    /// Correlation key → callback channel of the waiting tail call
    callbacks: Mutex<HashMap<String, mpsc::Sender<Line>>>,
    /// Set on teardown; guards against sends into a dead session
    closed: AtomicBool,
}

impl ProviderSession {
    /// Create a session and the receiving end of its command queue
    ///
    /// The caller wires the receiver to the provider connection's write
    /// half (the forwarding loop).
    pub fn new(name: impl Into<String>, queue_capacity: usize) -> (Arc<Self>, mpsc::Receiver<ProviderCommand>) {
        let (outbound, request_rx) = mpsc::channel(queue_capacity);
        let session = Arc::new(Self {
            name: name.into(),
            outbound,
            callbacks: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        (session, request_rx)
    }

    /// Provider name this session was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a request toward the provider
    ///
    /// Fail-fast: a closed session or a full queue errors immediately
    /// rather than blocking the tail call behind a stalled provider.
    pub fn send(&self, request: TailRequest) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::SessionClosed {
                name: self.name.clone(),
            });
        }
        self.outbound
            .try_send(ProviderCommand::Request(request))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => RelayError::RequestQueueFull {
                    name: self.name.clone(),
                },
                mpsc::error::TrySendError::Closed(_) => RelayError::SessionClosed {
                    name: self.name.clone(),
                },
            })
    }

    /// Tell the provider to stop tailing for a key
    ///
    /// Best-effort: a full queue or a closed session drops the notice, and
    /// the provider's next line for the key triggers another attempt.
    pub fn cancel(&self, key: &str) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let command = ProviderCommand::Cancel(key.to_string());
        if self.outbound.try_send(command).is_err() {
            trace!(key = %key, "cancel notice dropped");
        }
    }

    /// Register a callback channel under a correlation key
    ///
    /// Keys are generated collision-resistant, but a collision is still
    /// checked rather than assumed away.
    pub fn add_callback(&self, key: &str, sender: mpsc::Sender<Line>) -> Result<()> {
        let mut callbacks = self.callbacks.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::SessionClosed {
                name: self.name.clone(),
            });
        }
        if callbacks.contains_key(key) {
            return Err(RelayError::DuplicateKey {
                key: key.to_string(),
            });
        }
        callbacks.insert(key.to_string(), sender);
        Ok(())
    }

    /// Remove the callback for a key (idempotent)
    pub fn remove_callback(&self, key: &str) {
        self.callbacks.lock().remove(key);
    }

    /// Number of callbacks currently registered
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Whether this session has been torn down
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Route one incoming line to the callback registered under its key
    ///
    /// The lookup holds the session lock; delivery does not, so a suspended
    /// send for one key never blocks lookups or teardown for others. Lines
    /// whose key has no callback (late delivery after cancellation) are
    /// dropped, and the provider is told to stop tailing for that key.
    pub async fn dispatch(&self, line: Line) {
        let callback = self.callbacks.lock().get(&line.key).cloned();
        let Some(sender) = callback else {
            trace!(key = %line.key, "no callback registered, dropping line");
            if !line.eof {
                self.cancel(&line.key);
            }
            return;
        };

        let key = line.key.clone();
        let eof = line.eof;
        if sender.send(line).await.is_err() {
            // Consumer call went away; its key is dead now
            self.remove_callback(&key);
            self.cancel(&key);
        } else if eof {
            self.remove_callback(&key);
        }
    }

    /// Tear the session down
    ///
    /// Marks the session closed and cancels every pending callback by
    /// closing its channel; waiting tail calls observe the close and fail
    /// with `Cancelled` instead of blocking forever. Idempotent.
    pub fn shutdown(&self) {
        let drained: Vec<(String, mpsc::Sender<Line>)> = {
            let mut callbacks = self.callbacks.lock();
            self.closed.store(true, Ordering::Release);
            callbacks.drain().collect()
        };
        if !drained.is_empty() {
            debug!(
                provider = %self.name,
                pending = drained.len(),
                "cancelling in-flight callbacks"
            );
        }
        // Dropping the senders closes each call's channel
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
