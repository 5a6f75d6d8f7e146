//! Live adapter for the `RevisionDirectory` port.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde_json::Value;

use super::mediawiki::ActionClient;
use crate::ports::filesystem::{read_snapshot, FileSystem};
use crate::ports::revisions::RevisionDirectory;

/// Looks revisions up in a local `title -> revid` snapshot, then remotely.
pub struct SnapshotRevisionDirectory {
    fs: Box<dyn FileSystem>,
    snapshot_path: PathBuf,
    snapshot: OnceLock<HashMap<String, String>>,
    client: ActionClient,
    api: String,
}

impl SnapshotRevisionDirectory {
    /// Creates the directory. The snapshot is read through `fs` on first use.
    #[must_use]
    pub fn new(
        fs: Box<dyn FileSystem>,
        snapshot_path: PathBuf,
        client: ActionClient,
        api: &str,
    ) -> Self {
        Self { fs, snapshot_path, snapshot: OnceLock::new(), client, api: api.to_string() }
    }

    fn snapshot(&self) -> &HashMap<String, String> {
        self.snapshot.get_or_init(|| {
            read_snapshot(self.fs.as_ref(), &self.snapshot_path, "revision")
                .map(|raw| parse_snapshot(&raw))
                .unwrap_or_default()
        })
    }
}

impl RevisionDirectory for SnapshotRevisionDirectory {
    fn revision_for(
        &self,
        title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(revid) = self.snapshot().get(title).filter(|r| !r.is_empty()) {
            return Ok(Some(revid.clone()));
        }
        let body = self.client.get_json(&self.api, &[("get", "revids"), ("title", title)])?;
        Ok(revid_from_results(&body, title))
    }
}

/// Parses a snapshot object, keeping string and integer revids.
pub(crate) fn parse_snapshot(raw: &str) -> HashMap<String, String> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
        tracing::warn!("revision snapshot is not a JSON object");
        return HashMap::new();
    };
    map.into_iter().filter_map(|(title, v)| scalar_string(&v).map(|r| (title, r))).collect()
}

/// Extracts the revid for `title` from a `{"results": [{title, revid}]}` body.
fn revid_from_results(body: &Value, title: &str) -> Option<String> {
    body.get("results")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("title").and_then(Value::as_str) == Some(title))
        .and_then(|entry| entry.get("revid"))
        .and_then(scalar_string)
        .filter(|r| !r.is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
