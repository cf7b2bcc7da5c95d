//! Tailpipe agent - the file provider
//!
//! Runs next to the files. Holds one long-lived connection to the relay,
//! registered under a provider name (default: hostname), and serves each
//! forwarded tail request by streaming the file's lines back tagged with
//! the request's correlation key.

mod agent;
mod error;
mod tailer;

pub use agent::{AgentConfig, DEFAULT_RELAY_ADDR, run};
pub use error::AgentError;
pub use tailer::tail_file;
