//! Watch command - refresh on a cadence until interrupted.

use anyhow::{Result, bail};
use clap::Args;
use copilotbar_github::spawn_refresh_task;
use copilotbar_store::SettingsStore;
use std::io::{Write, stdout};
use std::time::Duration;
use tracing::info;

use crate::app::App;
use crate::commands::usage::print_state;
use crate::{Cli, ExitCode, OutputFormat};

/// Shortest accepted refresh interval.
const MIN_INTERVAL_SECS: u64 = 10;

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds (defaults to the configured cadence).
    #[arg(long, short)]
    pub interval: Option<u64>,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    let period = match args.interval {
        Some(secs) => Duration::from_secs(secs.max(MIN_INTERVAL_SECS)),
        None => match settings.refresh_cadence().await.as_duration() {
            Some(period) => period,
            None => bail!(
                "refresh cadence is manual; pass --interval or run `copilotbar config refresh 5m`"
            ),
        },
    };

    let app = App::load(settings).await?;
    if app.session.restore().await?.is_none() {
        return print_state(&app.session, cli).await;
    }

    info!(seconds = period.as_secs(), "Starting watch mode");

    let store = app.session.usage_store().clone();
    let mut changes = store.subscribe();
    let task = spawn_refresh_task(app.session.clone(), period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                if store.is_refreshing().await {
                    continue;
                }
                if cli.format == OutputFormat::Text {
                    // Clear screen
                    print!("\x1b[2J\x1b[H");
                    stdout().flush()?;
                    let now = chrono::Local::now();
                    println!(
                        "CopilotBar Watch Mode - {} (refresh: {}s)",
                        now.format("%H:%M:%S"),
                        period.as_secs()
                    );
                    println!("{}", "─".repeat(50));
                    println!();
                }
                print_state(&app.session, cli).await?;
                if cli.format == OutputFormat::Text {
                    println!();
                    if store.snapshot().await.is_some() && store.is_stale(period * 2).await {
                        println!("Showing stale data: the last successful refresh is over two intervals old");
                    }
                    println!("Press Ctrl+C to exit");
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping watch mode");
                break;
            }
        }
    }

    task.abort();
    Ok(ExitCode::Success)
}
