//! `mdpublish serve` command.

use std::sync::Arc;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::publish::Publisher;
use crate::server;

/// Execute the `serve` command.
///
/// Runs the HTTP endpoint on a single-threaded runtime; each request's
/// pipeline runs on the blocking pool.
///
/// # Errors
///
/// Returns an error string if the runtime cannot start or the server fails.
pub fn run(ctx: ServiceContext, settings: Settings, bind: Option<&str>) -> Result<(), String> {
    let bind = bind.map_or_else(|| settings.bind.clone(), str::to_string);
    let publisher = Arc::new(Publisher::new(ctx, settings));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;
    runtime.block_on(server::serve(publisher, &bind))
}
