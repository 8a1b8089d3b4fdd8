//! History command - recorded daily usage.

use anyhow::Result;
use clap::Args;
use copilotbar_store::{MAX_HISTORY_DAYS, SettingsStore};
use tracing::info;

use crate::app::App;
use crate::output::{HistoryOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Number of most recent days to show.
    #[arg(long, short, default_value = "14")]
    pub days: usize,

    /// Delete all recorded history.
    #[arg(long)]
    pub clear: bool,
}

/// Runs the history command.
pub async fn run(args: &HistoryArgs, cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    let app = App::load(settings).await?;
    let history = app.history();

    if args.clear {
        history.clear().await?;
        info!("History cleared");
        if !cli.quiet {
            println!("Usage history cleared");
        }
        return Ok(ExitCode::Success);
    }

    let entries = history.entries().await?;
    let output = HistoryOutput::from_entries(&entries, args.days.min(MAX_HISTORY_DAYS));

    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&output)?),
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_history(&output, None));
        }
    }

    Ok(ExitCode::Success)
}
