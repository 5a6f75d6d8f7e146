//! Recording adapter for the `LinkService` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::credentials::CredentialPair;
use crate::ports::link::{LinkService, SiteLinkRequest};

/// Records site-link calls while delegating to an inner implementation.
pub struct RecordingLinkService {
    inner: Box<dyn LinkService>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingLinkService {
    /// Creates a new recording link service wrapping the given implementation.
    pub fn new(inner: Box<dyn LinkService>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct SiteLinkInput<'a> {
    request: &'a SiteLinkRequest,
    principal: &'a str,
}

impl LinkService for RecordingLinkService {
    fn set_sitelink(
        &self,
        request: &SiteLinkRequest,
        credentials: &CredentialPair,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.set_sitelink(request, credentials);
        let input = SiteLinkInput { request, principal: &credentials.principal };
        record_result(&self.recorder, "link", "set_sitelink", &input, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cassette::format::Cassette;
    use crate::publish::fixtures::{credentials_for, ScriptedLinks};

    #[test]
    fn records_request_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test")));
        let request = SiteLinkRequest::new("Q1", "Foo", "fr", "Foo (fr)");

        {
            let inner = ScriptedLinks::new(vec![Err("timeout".into())]);
            let service = RecordingLinkService::new(Box::new(inner), Arc::clone(&recorder));
            assert!(service.set_sitelink(&request, &credentials_for("Bob")).is_err());
        }
        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let cassette = Cassette::from_yaml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let recorded = &cassette.interactions[0];
        assert_eq!(recorded.input["request"]["qid"], json!("Q1"));
        assert_eq!(recorded.input["principal"], json!("Bob"));
        assert_eq!(recorded.output, json!({"Err": "timeout"}));
    }
}
