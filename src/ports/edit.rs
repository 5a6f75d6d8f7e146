//! Edit service port for submitting page edits to the wiki.

use serde::{Deserialize, Serialize};

use super::credentials::CredentialPair;

/// An edit of one page on one language wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    /// Target wiki language code.
    pub lang: String,
    /// Page title to create or overwrite.
    pub title: String,
    /// Edit summary.
    pub summary: String,
    /// Full wikitext.
    pub text: String,
    /// Captcha id echoed back after a captcha challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_id: Option<String>,
    /// Captcha answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_word: Option<String>,
}

impl EditRequest {
    /// Action API parameters for this edit, without the CSRF token.
    ///
    /// Captcha fields are only sent when both are present.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("action", "edit".to_string()),
            ("title", self.title.clone()),
            ("summary", self.summary.clone()),
            ("text", self.text.clone()),
            ("format", "json".to_string()),
        ];
        if let (Some(id), Some(word)) = (&self.captcha_id, &self.captcha_word) {
            params.push(("wpCaptchaId", id.clone()));
            params.push(("wpCaptchaWord", word.clone()));
        }
        params
    }
}

/// Submits edits on behalf of a principal.
pub trait EditService: Send + Sync {
    /// Submits the edit and returns the service's JSON payload verbatim.
    ///
    /// Rejections (protected page, abuse filter, captcha, ...) come back as
    /// `Ok` payloads; `Err` is reserved for transport failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or answers with
    /// something that is not JSON.
    fn submit(
        &self,
        request: &EditRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>>;
}
