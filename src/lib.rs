//! Core library entry for the `mdpublish` CLI and publish endpoint.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod ports;
pub mod publish;
pub mod server;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
/// `--help` and `--version` print to stdout and succeed.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print().map_err(|e| e.to_string())?;
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["mdpublish", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn help_and_version_succeed() {
        assert!(run(["mdpublish", "--help"]).is_ok());
        assert!(run(["mdpublish", "credentials", "--help"]).is_ok());
        assert!(run(["mdpublish", "--version"]).is_ok());
    }

    #[test]
    fn run_errors_on_missing_subcommand() {
        let err = run(["mdpublish"]).unwrap_err();
        assert!(err.contains("Usage"));
    }
}
