//! Token command - save, clear and inspect the access token.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use copilotbar_core::Credential;
use copilotbar_github::{CredentialValidator, Validation};
use copilotbar_store::SettingsStore;
use std::io::Read;
use tracing::info;

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter, TokenStatusOutput};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the token command.
#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenAction {
    /// Validate and save a token.
    Set {
        /// The token, or `-` to read it from stdin.
        token: String,

        /// Save without asking GitHub first.
        #[arg(long)]
        no_verify: bool,
    },

    /// Delete the saved token.
    Clear,

    /// Show which token is in use.
    Status {
        /// Also check the token against GitHub.
        #[arg(long)]
        verify: bool,
    },
}

/// Runs the token command.
pub async fn run(args: &TokenArgs, cli: &Cli, settings: &SettingsStore) -> Result<ExitCode> {
    let app = App::load(settings).await?;

    match &args.action {
        TokenAction::Set { token, no_verify } => set_token(&app, token, *no_verify, cli).await,
        TokenAction::Clear => clear_token(&app, cli).await,
        TokenAction::Status { verify } => token_status(&app, *verify, cli).await,
    }
}

fn read_token(arg: &str) -> Result<Credential> {
    let raw = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read token from stdin")?;
        buf
    } else {
        arg.to_string()
    };
    Ok(Credential::new(raw)?)
}

async fn set_token(app: &App, token: &str, no_verify: bool, cli: &Cli) -> Result<ExitCode> {
    let credential = read_token(token)?;

    if !no_verify {
        match CredentialValidator::new(app.api.clone()).validate(&credential).await {
            Validation::Valid { identity } => {
                if !cli.quiet {
                    println!("Authenticated as {}", identity.login);
                }
            }
            Validation::Invalid { reason } => bail!("token rejected: {reason}"),
        }
    }

    app.session.connect(credential).await?;
    info!("Token saved");
    if !cli.quiet {
        println!("Token saved");
    }
    Ok(ExitCode::Success)
}

async fn clear_token(app: &App, cli: &Cli) -> Result<ExitCode> {
    let had_token = app.credentials().has_stored().await?;
    app.session.clear_credential().await?;

    if !cli.quiet {
        if had_token {
            println!("Token deleted");
        } else {
            println!("No saved token to delete");
        }
    }
    Ok(ExitCode::Success)
}

async fn token_status(app: &App, verify: bool, cli: &Cli) -> Result<ExitCode> {
    let loaded = app.credentials().load().await?;

    let mut output = TokenStatusOutput {
        configured: loaded.is_some(),
        source: None,
        hint: None,
        valid: None,
        account: None,
        error: None,
    };

    if let Some((credential, source)) = &loaded {
        output.source = Some(source.to_string());
        output.hint = Some(credential.hint());

        if verify {
            match CredentialValidator::new(app.api.clone()).validate(credential).await {
                Validation::Valid { identity } => {
                    output.valid = Some(true);
                    output.account = Some(identity);
                }
                Validation::Invalid { reason } => {
                    output.valid = Some(false);
                    output.error = Some(reason);
                }
            }
        }
    }

    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&output)?),
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_token_status(&output));
        }
    }

    Ok(match (output.configured, output.valid) {
        (false, _) | (true, Some(false)) => ExitCode::NotConnected,
        _ => ExitCode::Success,
    })
}
