//! Replaying adapter for the `RevisionDirectory` port.

use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::revisions::RevisionDirectory;

/// Serves recorded revision lookups.
pub struct ReplayingRevisionDirectory {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingRevisionDirectory {
    /// Creates a new replaying revision directory from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl RevisionDirectory for ReplayingRevisionDirectory {
    fn revision_for(
        &self,
        _title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        replay_result(&self.replayer, "revisions", "revision_for")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::replayer_of;
    use crate::cassette::format::Interaction;
    use serde_json::json;

    #[test]
    fn null_means_unknown_revision() {
        let lookup = |seq, output| Interaction {
            seq,
            port: "revisions".into(),
            method: "revision_for".into(),
            input: json!({"title": "Foo"}),
            output,
        };
        let dir = ReplayingRevisionDirectory::new(replayer_of(vec![
            lookup(0, json!({"Ok": "1234"})),
            lookup(1, json!({"Ok": null})),
        ]));
        assert_eq!(dir.revision_for("Foo").unwrap(), Some("1234".into()));
        assert_eq!(dir.revision_for("Foo").unwrap(), None);
    }
}
