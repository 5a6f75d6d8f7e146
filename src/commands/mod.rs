//! Command dispatch and handlers.

pub mod credentials;
pub mod init_db;
pub mod publish;
pub mod reports;
pub mod serve;

use std::env;
use std::path::PathBuf;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `PUBLISH_RECORD` is set to a directory path, the network, clock and
/// id interactions of `serve` and `publish` are recorded to per-port
/// cassette files under that directory.
///
/// # Errors
///
/// Returns an error string if settings are invalid or the handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let settings = Settings::from_env().map_err(|e| e.to_string())?;
    match command {
        Command::Serve { bind } => with_context(&settings, |ctx| {
            serve::run(ctx, settings.clone(), bind.as_deref())
        }),
        Command::Publish { file } => {
            with_context(&settings, |ctx| publish::run(ctx, settings.clone(), file))
        }
        Command::InitDb => init_db::run(&settings),
        Command::Credentials { action } => credentials::run(&settings, action),
        Command::Reports { limit } => reports::run(&settings, *limit),
    }
}

/// Builds a live (or recording) context and hands it to `handler`.
fn with_context<F>(settings: &Settings, handler: F) -> Result<(), String>
where
    F: FnOnce(ServiceContext) -> Result<(), String>,
{
    let (ctx, session) = if let Ok(path) = env::var("PUBLISH_RECORD") {
        let (ctx, session) = ServiceContext::recording_at(settings, &PathBuf::from(path))?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(settings)?, None)
    };

    // The handler owns the context, so it is dropped before the session ends.
    let result = handler(ctx);

    if let Some(session) = session {
        finish_recording(session)?;
    }

    result
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
