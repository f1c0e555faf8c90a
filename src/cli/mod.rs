//! CLI module for geoarchive.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Sign-in and session commands
//! - Starting, watching and cancelling server-side tasks
//!
//! # Usage
//!
//! ```ignore
//! use geoarchive::cli::{parse_args, run_cli_command};
//! use geoarchive::config::ClientConfig;
//!
//! let command = parse_args(std::env::args());
//! if let Err(e) = run_cli_command(command, &ClientConfig::from_env()) {
//!     eprintln!("Error: {}", e);
//!     std::process::exit(1);
//! }
//! ```

pub mod account;
pub mod args;
pub mod tasks;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use version::{version_line, VERSION};

use color_eyre::eyre::eyre;
use color_eyre::{Report, Result};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::Backend;
use crate::tasks::JobKind;

/// Run a parsed CLI command.
///
/// Commands that talk to the service run on a fresh tokio runtime.
pub fn run_cli_command(command: CliCommand, config: &ClientConfig) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Invalid(message) => Err(eyre!("{}\n\n{}", message, USAGE)),
        command => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_remote_command(command, config))
        }
    }
}

/// Turn a client error into a report carrying its recovery hint.
pub(crate) fn report(err: impl Into<ClientError>) -> Report {
    let err = err.into();
    tracing::debug!("{} ({})", err, err.error_code());
    eyre!("{}\n{}", err.user_message(), err.recovery_hint())
}

fn check_config(config: &ClientConfig) -> std::result::Result<(), ClientError> {
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(ClientError::Config {
            message: format!("API URL must start with http:// or https://: {}", config.base_url),
        });
    }
    Ok(())
}

async fn run_remote_command(command: CliCommand, config: &ClientConfig) -> Result<()> {
    check_config(config).map_err(report)?;
    tracing::debug!("Using API at {}", config.base_url);
    let backend = Backend::from_config(config);

    match command {
        CliCommand::Login { username } => account::handle_login(&backend, &username).await,
        CliCommand::Logout => account::handle_logout(&backend).await,
        CliCommand::Whoami => account::handle_whoami(&backend).await,
        CliCommand::Convert { item_id, detach } => {
            let kind = JobKind::GeoRasterConversion { item_id };
            tasks::handle_start(&backend, config, kind, detach).await
        }
        CliCommand::Georeference {
            file_id,
            request,
            detach,
        } => {
            let kind = tasks::parse_request(&file_id, &request)?;
            tasks::handle_start(&backend, config, kind, detach).await
        }
        CliCommand::Watch { task_id } => tasks::handle_watch(&backend, config, &task_id).await,
        CliCommand::Cancel { task_id } => tasks::handle_cancel(&backend, &task_id).await,
        CliCommand::Version | CliCommand::Help | CliCommand::Invalid(_) => Ok(()),
    }
}
