//! CLI command implementations.

pub mod check;
pub mod config;
pub mod history;
pub mod token;
pub mod usage;
pub mod watch;
