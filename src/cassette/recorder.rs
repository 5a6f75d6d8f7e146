//! Records interactions into a cassette file.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Records interactions and writes them as a YAML cassette file.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
    next_seq: u64,
}

impl CassetteRecorder {
    /// Create a new recorder that will write to the given path.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), interactions: Vec::new(), next_seq: 0 }
    }

    /// Record an interaction. The `seq` field is assigned automatically.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let interaction = Interaction {
            seq: self.next_seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        };
        self.next_seq += 1;
        self.interactions.push(interaction);
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Finish recording and write the cassette YAML file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            interactions: self.interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, yaml)?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "test-recording");
        assert!(recorder.is_empty());
        recorder.record("edit", "submit", json!({"title": "Foo"}), json!({"Ok": {}}));
        recorder.record("link", "set_sitelink", json!({}), json!({"Ok": {"success": 1}}));
        recorder.record("clock", "now", json!(null), json!("2024-05-01T12:00:00Z"));
        assert_eq!(recorder.len(), 3);

        let result_path = recorder.finish().expect("finish should succeed");
        assert_eq!(result_path, path);

        let content = std::fs::read_to_string(&path).unwrap();
        let cassette = Cassette::from_yaml(&content).unwrap();

        assert_eq!(cassette.name, "test-recording");
        assert_eq!(cassette.version, env!("CARGO_PKG_VERSION"));
        let seqs: Vec<u64> = cassette.interactions.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(cassette.interactions[1].port, "link");
    }
}
