//! Filesystem port for file I/O operations.

use std::path::Path;

/// Provides the disk access the pipeline needs: reading snapshots and
/// appending audit documents.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Appends `contents` to a file, creating it and any missing parent
    /// directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be written.
    fn append(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}

/// Reads an optional JSON snapshot. A missing file is expected and yields
/// `None` quietly; an unreadable one is logged.
pub fn read_snapshot(fs: &dyn FileSystem, path: &Path, name: &str) -> Option<String> {
    if !fs.exists(path) {
        tracing::debug!(path = %path.display(), snapshot = name, "snapshot not present");
        return None;
    }
    match fs.read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                snapshot = name,
                error = %e,
                "snapshot unreadable"
            );
            None
        }
    }
}
