//! Replaying adapter for the `LinkService` port.

use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::credentials::CredentialPair;
use crate::ports::link::{LinkService, SiteLinkRequest};

/// Serves recorded site-link responses.
pub struct ReplayingLinkService {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingLinkService {
    /// Creates a new replaying link service from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl LinkService for ReplayingLinkService {
    fn set_sitelink(
        &self,
        _request: &SiteLinkRequest,
        _credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        replay_result(&self.replayer, "link", "set_sitelink")
    }
}
