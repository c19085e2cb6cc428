//! Command implementations and shared output helpers.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod payment;
mod render;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use dorsal_storefront::config::{ConfigError, StorefrontConfig};
use dorsal_storefront::error::report;
use dorsal_storefront::medusa::{MedusaClient, MedusaError};
use dorsal_storefront::storage::FileStorage;
use dorsal_storefront::{ErrorKind, Settings, Storefront, StorefrontError};

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("Backend error: {0}")]
    Medusa(#[from] MedusaError),

    #[error("Could not encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Backend is not answering")]
    Unhealthy,

    /// The command line is incomplete for what the backend offered.
    #[error("{0}")]
    Usage(String),
}

/// What every command runs against.
pub struct Context {
    pub storefront: Storefront,
    /// Direct client for catalog reads, sharing the storefront's cache.
    pub client: MedusaClient,
    pub json: bool,
}

impl Context {
    /// Build the client and storefront for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, json: bool) -> Result<Self, CliError> {
        let client = MedusaClient::new(&config.medusa)?;
        let storefront = Storefront::builder(
            Arc::new(client.clone()),
            Arc::new(FileStorage::new(&config.state_dir)),
        )
        .settings(Settings::from(config))
        .build();

        Ok(Self {
            storefront,
            client,
            json,
        })
    }

    /// Print `value` as JSON with `--json`, otherwise as `text` renders it.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be encoded.
    #[allow(clippy::print_stdout)]
    pub fn emit<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }

    /// Print a plain message (suppressed with `--json`).
    #[allow(clippy::print_stdout)]
    pub fn say(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }
}

/// Tell the user why the command failed and where the storefront would send
/// them next.
#[allow(clippy::print_stderr)]
pub fn fail(err: &CliError) {
    match err {
        CliError::Storefront(e) => {
            // The reconciler reports ambiguous outcomes itself
            if e.kind() != ErrorKind::AmbiguousOutcome {
                report(e);
            }
            eprintln!("{}", e.user_message());
            if let Some(next) = e.navigation() {
                eprintln!("Next: {}", next.location());
            }
        }
        other => {
            tracing::error!("Command failed: {other}");
            eprintln!("{other}");
        }
    }
}
