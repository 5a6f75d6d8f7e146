//! `mdpublish init-db` command.

use crate::adapters::live::sqlite::SqliteStore;
use crate::config::Settings;

/// Execute the `init-db` command.
///
/// Opening the store creates any missing table, so running it twice is
/// harmless.
///
/// # Errors
///
/// Returns an error string if the database cannot be opened.
pub fn run(settings: &Settings) -> Result<(), String> {
    SqliteStore::open(&settings.db_path)
        .map_err(|e| format!("Failed to open database {}: {e}", settings.db_path.display()))?;
    tracing::info!(db = %settings.db_path.display(), "schema ready");
    println!("Initialized database at {}", settings.db_path.display());
    Ok(())
}
