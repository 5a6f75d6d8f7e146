//! Live adapter for the `LinkService` port.

use serde_json::json;

use super::mediawiki::ActionClient;
use crate::ports::credentials::CredentialPair;
use crate::ports::link::{LinkService, SiteLinkRequest};
use crate::ports::TOKEN_FAILURE;

/// Sets site-links on the knowledge base through its action API.
pub struct HttpLinkService {
    client: ActionClient,
    api: String,
}

impl HttpLinkService {
    /// Creates the service for a fixed API endpoint.
    #[must_use]
    pub fn new(client: ActionClient, api: &str) -> Self {
        Self { client, api: api.to_string() }
    }
}

impl LinkService for HttpLinkService {
    fn set_sitelink(
        &self,
        request: &SiteLinkRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let Some(token) = self.client.csrf_token(&self.api, credentials)? else {
            tracing::warn!(principal = %credentials.principal, "no csrf token for site-link");
            return Ok(json!({ "error": TOKEN_FAILURE }));
        };
        self.client.post_action(&self.api, &request.params(), &token, credentials)
    }
}
