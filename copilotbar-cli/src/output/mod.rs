//! Output formatting for CLI.

mod json;
mod text;

pub use json::{HistoryOutput, JsonFormatter, TokenStatusOutput, UsageOutput};
pub use text::TextFormatter;
