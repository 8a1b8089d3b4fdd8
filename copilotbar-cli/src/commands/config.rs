//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use copilotbar_store::{
    RefreshCadence, SettingsStore, default_config_dir, default_data_path,
};
use tracing::info;

use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set refresh cadence.
    Refresh {
        /// Cadence: manual, 1m, 2m, 5m, 15m, 30m.
        cadence: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli, settings).await?,
        ConfigAction::Path => show_paths(cli, settings)?,
        ConfigAction::Refresh { cadence } => set_refresh(cadence, settings).await?,
        ConfigAction::Reset => reset_config(settings).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("CopilotBar Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Refresh cadence:  {}", settings.refresh_cadence);
            println!("Log level:        {}", settings.log_level);
            println!("API base URL:     {}", settings.api_base_url);
            println!("Request timeout:  {}s", settings.request_timeout_secs);
            println!("Allow estimate:   {}", settings.allow_estimate);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = store.path();
    let data_path = default_data_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Data file:     {}", data_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "data_file": data_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_refresh(cadence: &str, store: &SettingsStore) -> Result<()> {
    let cadence: RefreshCadence = cadence.parse()?;

    store.set_refresh_cadence(cadence).await;
    store.save().await?;

    info!(cadence = %cadence, "Refresh cadence updated");
    println!("Refresh cadence set to: {cadence}");

    Ok(())
}

async fn reset_config(store: &SettingsStore) -> Result<()> {
    store.reset().await;
    store.save().await?;

    info!(path = %store.path().display(), "Settings reset");
    println!("Configuration reset to defaults");

    Ok(())
}
