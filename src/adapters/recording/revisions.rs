//! Recording adapter for the `RevisionDirectory` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::revisions::RevisionDirectory;

/// Records revision lookups while delegating to an inner implementation.
pub struct RecordingRevisionDirectory {
    inner: Box<dyn RevisionDirectory>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingRevisionDirectory {
    /// Creates a new recording revision directory wrapping the given implementation.
    pub fn new(
        inner: Box<dyn RevisionDirectory>,
        recorder: Arc<Mutex<CassetteRecorder>>,
    ) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct TitleInput<'a> {
    title: &'a str,
}

impl RevisionDirectory for RecordingRevisionDirectory {
    fn revision_for(
        &self,
        title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.revision_for(title);
        record_result(&self.recorder, "revisions", "revision_for", &TitleInput { title }, &result);
        result
    }
}
