//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Per-port `CassetteRecorder`s for one recording session.
///
/// Each port writes its own `<port>.cassette.yaml` inside a timestamped
/// directory, which [`super::config::CassetteConfig::from_dir`] can load
/// back for replay.
pub struct RecordingSession {
    /// Recorder for clock interactions.
    pub clock: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for ID generator interactions.
    pub id_gen: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for edit submissions.
    pub edit: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for site-link calls.
    pub link: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for revision lookups.
    pub revisions: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates a session writing to `<root>/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new(root: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = root.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let make_recorder = |port: &str| -> Arc<Mutex<CassetteRecorder>> {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, format!("{timestamp}-{port}"))))
        };

        Ok(Self {
            clock: make_recorder("clock"),
            id_gen: make_recorder("id_gen"),
            edit: make_recorder("edit"),
            link: make_recorder("link"),
            revisions: make_recorder("revisions"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Finish all recorders and write cassette files to disk.
    ///
    /// The context holding the recording adapters must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be
    /// written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.clock, "clock")?;
        finish_one(self.id_gen, "id_gen")?;
        finish_one(self.edit, "edit")?;
        finish_one(self.link, "link")?;
        finish_one(self.revisions, "revisions")?;

        Ok(self.output_dir)
    }
}
