//! JSON output formatting.

use anyhow::Result;
use copilotbar_core::{Identity, UsageSnapshot};
use copilotbar_store::ConnectionState;
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output of the `usage` and `watch` commands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub connection: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One recorded day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOutput {
    pub date: String,
    pub count: u64,
}

/// JSON output of the `history` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOutput {
    pub days: Vec<DayOutput>,
    pub total: u64,
}

impl HistoryOutput {
    /// Builds the output from the last `days` entries, oldest first.
    pub fn from_entries(entries: &BTreeMap<String, u64>, days: usize) -> Self {
        let skip = entries.len().saturating_sub(days);
        let days: Vec<DayOutput> = entries
            .iter()
            .skip(skip)
            .map(|(date, count)| DayOutput {
                date: date.clone(),
                count: *count,
            })
            .collect();
        let total = days.iter().map(|d| d.count).sum();
        Self { days, total }
    }
}

/// JSON output of `token status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatusOutput {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
