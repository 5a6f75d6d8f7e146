//! `mdpublish publish` command.

use std::path::Path;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::publish::request::PublicationRequest;
use crate::publish::Publisher;

/// Execute the `publish` command.
///
/// Reads one request from a JSON file, runs it, and prints the response
/// body. A request that ends in a rejection still exits successfully; the
/// outcome is in the printed body.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or is not a request.
pub fn run(ctx: ServiceContext, settings: Settings, file: &Path) -> Result<(), String> {
    let request = load_request(file)?;
    let publisher = Publisher::new(ctx, settings);
    let outcome = publisher.publish(&request);
    let body = serde_json::to_string_pretty(&outcome.body)
        .map_err(|e| format!("Failed to render response: {e}"))?;
    println!("{body}");
    eprintln!("Outcome: {}", outcome.category);
    Ok(())
}

fn load_request(file: &Path) -> Result<PublicationRequest, String> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid request in {}: {e}", file.display()))
}
