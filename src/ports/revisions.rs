//! Revision directory port.

/// Finds the source revision a translation was made from.
pub trait RevisionDirectory: Send + Sync {
    /// Returns the revision id recorded for a source title, if any.
    ///
    /// Implementations consult a local snapshot before any remote query.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote query fails.
    fn revision_for(
        &self,
        title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}
