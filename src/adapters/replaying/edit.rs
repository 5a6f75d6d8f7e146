//! Replaying adapter for the `EditService` port.

use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::credentials::CredentialPair;
use crate::ports::edit::{EditRequest, EditService};

/// Serves recorded edit responses without touching the network.
pub struct ReplayingEditService {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingEditService {
    /// Creates a new replaying edit service from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl EditService for ReplayingEditService {
    fn submit(
        &self,
        _request: &EditRequest,
        _credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        replay_result(&self.replayer, "edit", "submit")
    }
}
