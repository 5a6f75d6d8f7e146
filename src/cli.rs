//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `mdpublish`.
#[derive(Debug, Parser)]
#[command(
    name = "mdpublish",
    version,
    about = "Publish translated articles and audit the outcome"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the publish endpoint over HTTP.
    Serve {
        /// Listen address; defaults to `PUBLISH_BIND`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one publish request read from a JSON file and print the response.
    Publish {
        /// Path to the request JSON.
        file: PathBuf,
    },
    /// Create every table in the configured database.
    InitDb,
    /// Manage stored credentials.
    Credentials {
        /// What to do.
        #[command(subcommand)]
        action: CredentialsAction,
    },
    /// Print recent audit-table rows.
    Reports {
        /// Maximum number of rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// `credentials` subcommands.
#[derive(Debug, Subcommand)]
pub enum CredentialsAction {
    /// Encrypt and store a key/secret pair.
    Set {
        /// Principal name.
        #[arg(long)]
        user: String,
        /// Access key.
        #[arg(long)]
        key: String,
        /// Access secret.
        #[arg(long)]
        secret: String,
        /// Write to the legacy table instead of the current one.
        #[arg(long)]
        legacy: bool,
    },
    /// Remove a principal from the current table.
    Delete {
        /// Principal name.
        #[arg(long)]
        user: String,
    },
}
