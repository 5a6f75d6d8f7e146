//! Link service port for setting knowledge-base site-links.

use serde::{Deserialize, Serialize};

use super::credentials::CredentialPair;

/// Site the source articles live on when no entity id is known.
pub const SOURCE_SITE: &str = "enwiki";

/// Error reported when no CSRF token could be obtained for a principal.
pub const TOKEN_FAILURE: &str = "get_csrftoken failed";

/// Associates a published page with a knowledge-base entity.
///
/// The entity is addressed by `qid` when known, otherwise by the source
/// article's title on [`SOURCE_SITE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLinkRequest {
    /// Entity id, if the reference table had one.
    pub qid: Option<String>,
    /// Source article title.
    pub source_title: String,
    /// Site id of the new link, e.g. `frwiki`.
    pub link_site: String,
    /// Title of the published page.
    pub link_title: String,
}

impl SiteLinkRequest {
    /// Builds a request for `lang`, treating an empty `qid` as unknown.
    #[must_use]
    pub fn new(qid: &str, source_title: &str, lang: &str, link_title: &str) -> Self {
        Self {
            qid: (!qid.is_empty()).then(|| qid.to_string()),
            source_title: source_title.to_string(),
            link_site: format!("{lang}wiki"),
            link_title: link_title.to_string(),
        }
    }

    /// Action API parameters, without the CSRF token.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("action", "wbsetsitelink".to_string()),
            ("linktitle", self.link_title.clone()),
            ("linksite", self.link_site.clone()),
            ("format", "json".to_string()),
        ];
        match &self.qid {
            Some(qid) => params.push(("id", qid.clone())),
            None => {
                params.push(("title", self.source_title.clone()));
                params.push(("site", SOURCE_SITE.to_string()));
            }
        }
        params
    }
}

/// Sets site-links on behalf of a principal.
pub trait LinkService: Send + Sync {
    /// Submits the site-link and returns the service's JSON payload.
    ///
    /// A payload with `"success"` set means linked; one with `"error"` means
    /// refused. A failed token handshake is reported as the payload
    /// `{"error": TOKEN_FAILURE}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached.
    fn set_sitelink(
        &self,
        request: &SiteLinkRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>>;
}
