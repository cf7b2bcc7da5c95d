//! CLI subcommands

pub mod agent;
pub mod relay;
pub mod tail;
