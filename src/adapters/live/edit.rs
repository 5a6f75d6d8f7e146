//! Live adapter for the `EditService` port.

use serde_json::json;

use super::mediawiki::ActionClient;
use crate::ports::credentials::CredentialPair;
use crate::ports::edit::{EditRequest, EditService};
use crate::ports::TOKEN_FAILURE;

/// Submits edits to `{lang}` wikis through the action API.
pub struct HttpEditService {
    client: ActionClient,
    api_template: String,
}

impl HttpEditService {
    /// Creates the service; `{lang}` in `api_template` is replaced per request.
    #[must_use]
    pub fn new(client: ActionClient, api_template: &str) -> Self {
        Self { client, api_template: api_template.to_string() }
    }

    fn api_for(&self, lang: &str) -> String {
        self.api_template.replace("{lang}", lang)
    }
}

impl EditService for HttpEditService {
    fn submit(
        &self,
        request: &EditRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let api = self.api_for(&request.lang);
        let Some(token) = self.client.csrf_token(&api, credentials)? else {
            tracing::warn!(
                lang = %request.lang,
                principal = %credentials.principal,
                "no csrf token for edit"
            );
            return Ok(json!({ "error": TOKEN_FAILURE }));
        };
        tracing::debug!(lang = %request.lang, title = %request.title, "submitting edit");
        self.client.post_action(&api, &request.params(), &token, credentials)
    }
}
