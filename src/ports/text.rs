//! Text normalizer port.

/// Rewrites article text before it is submitted, e.g. to fix references.
pub trait TextNormalizer: Send + Sync {
    /// Returns the text to publish. An empty result means "keep the input".
    ///
    /// # Errors
    ///
    /// Returns an error if normalization fails; callers publish the input
    /// unchanged in that case.
    fn normalize(
        &self,
        source_title: &str,
        title: &str,
        text: &str,
        lang: &str,
        revid: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
