// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `CopilotBar` CLI - GitHub Copilot usage from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Save a token (validated against GitHub first)
//! copilotbar token set ghp_xxxxxxxxxxxx
//!
//! # Show current usage
//! copilotbar
//!
//! # JSON output
//! copilotbar --format json --pretty
//!
//! # Refresh every minute until Ctrl+C
//! copilotbar watch --interval 60
//!
//! # Last two weeks of daily usage
//! copilotbar history --days 14
//! ```

mod app;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use copilotbar_store::{LogLevel, SettingsStore};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, config, history, token, usage, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// `CopilotBar` CLI - GitHub Copilot usage monitoring.
#[derive(Parser)]
#[command(name = "copilotbar")]
#[command(about = "GitHub Copilot usage monitoring CLI")]
#[command(long_about = r#"
CopilotBar shows how much of your monthly GitHub Copilot allowance is used,
how today compares with an even daily budget, and keeps 60 days of history.

The token is read from the saved store first, then from $COPILOT_API_TOKEN,
then from $GITHUB_TOKEN.

Examples:
  copilotbar                       # Current usage
  copilotbar token set <TOKEN>     # Save a token
  copilotbar watch                 # Refresh on the configured cadence
  copilotbar history --days 30     # Daily history
  copilotbar --format json         # JSON output
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch current usage (default if no command specified).
    #[command(visible_alias = "u")]
    Usage,

    /// Keep refreshing until interrupted.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage the GitHub token.
    Token(token::TokenArgs),

    /// Show recorded daily usage.
    #[command(visible_alias = "h")]
    History(history::HistoryArgs),

    /// Check the token's account and Copilot seat.
    Check,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No token configured, or the last refresh failed.
    NotConnected = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("copilotbar=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("copilotbar={level}")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = SettingsStore::load_default().await?;
    setup_logging(cli.verbose, cli.quiet, settings.get().await.log_level);

    let result = match &cli.command {
        Some(Commands::Usage) | None => usage::run(&cli, &settings).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli, &settings).await,
        Some(Commands::Token(args)) => token::run(args, &cli, &settings).await,
        Some(Commands::History(args)) => history::run(args, &cli, &settings).await,
        Some(Commands::Check) => check::run(&cli, &settings).await,
        Some(Commands::Config(args)) => config::run(args, &cli, &settings).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
