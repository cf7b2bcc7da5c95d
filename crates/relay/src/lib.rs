//! Tailpipe relay - provider registry and request/response multiplexer
//!
//! The relay sits between file providers (agents) and tail clients. Agents
//! hold one long-lived connection each; tail calls are forwarded to the
//! right agent over that connection and the answering lines, which arrive
//! interleaved on the same stream, are demultiplexed back to the one call
//! that asked for them via a correlation key.
//!
//! # Architecture
//!
//! ```text
//! agent ──register──► RelayServer ──► ProviderSession ──► ProviderRegistry
//!                          │                ▲ ▲
//! client ──tail─────► RequestRouter ────────┘ │ (request queue)
//!                          ▲                  │
//!                          └── callback ◄─────┘ (dispatch by key)
//! ```
//!
//! All registry and session state is in memory; a relay restart requires
//! agents and clients to reconnect.

mod config;
mod error;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;

pub use config::{DEFAULT_LISTEN_ADDR, RelayConfig, Secret};
pub use error::RelayError;
pub use registry::ProviderRegistry;
pub use router::{LineSink, RequestRouter};
pub use server::RelayServer;
pub use session::{ProviderCommand, ProviderSession};
