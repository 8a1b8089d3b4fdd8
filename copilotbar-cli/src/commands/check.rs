//! Check command - account and seat diagnostics.

use anyhow::Result;
use copilotbar_github::run_check;
use copilotbar_store::SettingsStore;
use tracing::debug;

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the check command.
pub async fn run(cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    let app = App::load(settings).await?;

    let Some((credential, source)) = app.credentials().load().await? else {
        if !cli.quiet {
            eprintln!("No token configured. Run `copilotbar token set <TOKEN>`.");
        }
        return Ok(ExitCode::NotConnected);
    };
    debug!(%source, hint = %credential.hint(), "Checking credential");

    let report = run_check(app.api.as_ref(), &credential).await?;

    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&report)?),
        OutputFormat::Text => println!("{}", TextFormatter::new(!cli.no_color).format_check(&report)),
    }

    Ok(ExitCode::Success)
}
