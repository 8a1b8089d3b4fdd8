//! Usage command - one refresh, printed.

use anyhow::Result;
use copilotbar_github::Session;
use copilotbar_store::{ConnectionState, SettingsStore};
use tracing::{debug, info};

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter, UsageOutput};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the usage command.
pub async fn run(cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    let app = App::load(settings).await?;

    match app.session.restore().await? {
        Some(source) => debug!(%source, "Using credential"),
        None => {
            info!("No token configured");
            print_state(&app.session, cli).await?;
            return Ok(ExitCode::NotConnected);
        }
    }

    app.session.fetch_usage().await;
    print_state(&app.session, cli).await
}

/// Prints whatever the session's store currently holds.
///
/// Returns [`ExitCode::NotConnected`] unless a snapshot is connected.
pub async fn print_state(session: &Session, cli: &Cli) -> Result<ExitCode> {
    let store = session.usage_store();
    let output = UsageOutput {
        connection: store.connection().await,
        account: store.identity().await,
        usage: store.snapshot().await,
        error: store.error().await,
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            match (&output.connection, &output.usage) {
                (ConnectionState::Connected, Some(snapshot)) => {
                    println!("{}", formatter.format_usage(snapshot, output.account.as_ref()));
                }
                (ConnectionState::NotConfigured, _) => {
                    if !cli.quiet {
                        eprintln!(
                            "No token configured. Run `copilotbar token set <TOKEN>` or set $COPILOT_API_TOKEN."
                        );
                    }
                }
                _ => {
                    let error = output.error.as_deref().unwrap_or("refresh failed");
                    eprintln!("{}", formatter.format_error(error));
                }
            }
        }
    }

    Ok(match output.connection {
        ConnectionState::Connected => ExitCode::Success,
        _ => ExitCode::NotConnected,
    })
}
