//! Recording adapter for the `EditService` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::credentials::CredentialPair;
use crate::ports::edit::{EditRequest, EditService};

/// Records edit submissions while delegating to an inner implementation.
///
/// Only the request and principal are written; secrets never reach the
/// cassette.
pub struct RecordingEditService {
    inner: Box<dyn EditService>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingEditService {
    /// Creates a new recording edit service wrapping the given implementation.
    pub fn new(inner: Box<dyn EditService>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct SubmitInput<'a> {
    request: &'a EditRequest,
    principal: &'a str,
}

impl EditService for RecordingEditService {
    fn submit(
        &self,
        request: &EditRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.submit(request, credentials);
        let input = SubmitInput { request, principal: &credentials.principal };
        record_result(&self.recorder, "edit", "submit", &input, &result);
        result
    }
}
