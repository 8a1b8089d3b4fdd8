//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Local, Utc};
use copilotbar_core::{Identity, UsageSnapshot};
use copilotbar_github::{CheckReport, SeatStatus};

use super::json::{HistoryOutput, TokenStatusOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats a usage snapshot.
    pub fn format_usage(&self, snapshot: &UsageSnapshot, identity: Option<&Identity>) -> String {
        let mut lines = Vec::new();

        // Header: "GitHub Copilot (user metrics)"
        let source = if snapshot.is_estimate() {
            self.yellow(snapshot.source().display_name())
        } else {
            snapshot.source().display_name().to_string()
        };
        lines.push(format!("{} ({})", self.bold("GitHub Copilot"), source));

        let remaining_pct = (100.0 - snapshot.percent_used()).max(0.0);
        let bar = self.progress_bar(remaining_pct);
        let pct_str = self.color_for_percent(remaining_pct, &format!("{remaining_pct:.0}% left"));
        lines.push(format!("{:<8} {} {}", "Month:", bar, pct_str));
        lines.push(format!(
            "         {} of {} used, {} remaining",
            snapshot.used(),
            snapshot.total(),
            self.format_remaining(snapshot.remaining())
        ));

        let today = format!("{} / {}", snapshot.daily(), snapshot.daily_limit());
        let today = if snapshot.over_limit() {
            format!("{} {}", self.red(&today), self.red("over daily budget"))
        } else {
            self.green(&today)
        };
        lines.push(format!("{:<8} {}", "Today:", today));

        if let Some(identity) = identity {
            lines.push(format!("Account: {}", self.cyan(&identity.login)));
            if let Some(name) = &identity.name {
                lines.push(format!("Name:    {name}"));
            }
        }

        lines.push(self.dim(&format!("Updated {}", format_time(snapshot.fetched_at()))));

        if snapshot.is_estimate() {
            lines.push(self.yellow("Estimated: no usage endpoint answered for this account."));
        }

        lines.join("\n")
    }

    /// Formats a progress bar.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let clamped = percent_remaining.clamp(0.0, 100.0);
        let filled = ((clamped / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    /// Formats recorded daily history as a bar chart.
    #[allow(clippy::cast_precision_loss)]
    pub fn format_history(&self, history: &HistoryOutput, daily_limit: Option<u64>) -> String {
        if history.days.is_empty() {
            return self.dim("No usage recorded yet.");
        }

        let mut lines = Vec::new();
        lines.push(self.bold("Daily usage"));
        lines.push("─".repeat(40));

        let scale = daily_limit
            .filter(|l| *l > 0)
            .or_else(|| history.days.iter().map(|d| d.count).max())
            .unwrap_or(1)
            .max(1);

        for day in &history.days {
            let percent = (day.count as f64 / scale as f64) * 100.0;
            let over = daily_limit.is_some_and(|l| day.count > l);
            let bar = self.plain_bar(percent);
            let bar = if over { self.red(&bar) } else { self.blue(&bar) };
            lines.push(format!("{} {} {}", day.date, bar, day.count));
        }

        lines.push("─".repeat(40));
        lines.push(format!("Total:   {}", history.total));
        if let Some(limit) = daily_limit {
            lines.push(self.dim(&format!("Daily budget: {limit}")));
        }

        lines.join("\n")
    }

    /// Formats the result of `check`.
    pub fn format_check(&self, report: &CheckReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Account: {}", self.cyan(&report.identity.login)));
        if let Some(name) = &report.identity.name {
            lines.push(format!("Name:    {name}"));
        }

        match &report.seat {
            SeatStatus::Active { seat } => {
                let plan = seat.plan_type.as_deref().unwrap_or("unknown plan");
                lines.push(format!("Copilot: {} ({})", self.green("active"), plan));
                if let Some(at) = &seat.last_activity_at {
                    let editor = seat.last_activity_editor.as_deref().unwrap_or("unknown editor");
                    lines.push(self.dim(&format!("         Last used {at} in {editor}")));
                }
                if let Some(date) = &seat.pending_cancellation_date {
                    lines.push(self.yellow(&format!("         Seat ends {date}")));
                }
            }
            SeatStatus::NotEnabled => {
                lines.push(format!(
                    "Copilot: {}",
                    self.yellow("no seat visible to this token")
                ));
            }
            SeatStatus::Unknown { error } => {
                lines.push(format!("Copilot: {} - {}", self.red("unknown"), error));
            }
        }

        lines.join("\n")
    }

    /// Formats `token status`.
    pub fn format_token_status(&self, status: &TokenStatusOutput) -> String {
        if !status.configured {
            return format!(
                "{}\nRun {} or set $COPILOT_API_TOKEN.",
                self.yellow("No token configured."),
                self.bold("copilotbar token set <TOKEN>")
            );
        }

        let mut lines = Vec::new();
        let hint = status.hint.as_deref().unwrap_or("****");
        let source = status.source.as_deref().unwrap_or("unknown");
        lines.push(format!("Token:   {hint} ({source})"));

        match status.valid {
            Some(true) => {
                let login = status.account.as_ref().map_or("", |a| a.login.as_str());
                lines.push(format!("Status:  {} {}", self.green("valid"), self.cyan(login)));
            }
            Some(false) => {
                let reason = status.error.as_deref().unwrap_or("rejected");
                lines.push(format!("Status:  {} - {}", self.red("invalid"), reason));
            }
            None => {}
        }

        lines.join("\n")
    }

    /// Formats an error message.
    pub fn format_error(&self, error: &str) -> String {
        format!("{}: {}", self.red("Error"), error)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn plain_bar(&self, percent: f64) -> String {
        let filled = ((percent.clamp(0.0, 100.0) / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);
        format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        )
    }

    fn format_remaining(&self, remaining: i64) -> String {
        if remaining < 0 {
            self.red(&remaining.to_string())
        } else {
            remaining.to_string()
        }
    }

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
