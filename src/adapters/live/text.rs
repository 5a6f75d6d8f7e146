//! Live adapter for the `TextNormalizer` port.

use crate::ports::text::TextNormalizer;

/// Publishes text as submitted.
pub struct PassthroughNormalizer;

impl TextNormalizer for PassthroughNormalizer {
    fn normalize(
        &self,
        _source_title: &str,
        _title: &str,
        text: &str,
        _lang: &str,
        _revid: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(text.to_string())
    }
}
