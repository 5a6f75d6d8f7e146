//! Replaying adapters that serve recorded interactions.

pub mod clock;
pub mod edit;
pub mod id_gen;
pub mod link;
pub mod revisions;

pub use clock::ReplayingClock;
pub use edit::ReplayingEditService;
pub use id_gen::ReplayingIdGenerator;
pub use link::ReplayingLinkService;
pub use revisions::ReplayingRevisionDirectory;

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Takes the next recorded output for `port::method`.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    replayer.next_interaction(port, method).output.clone()
}

/// Replays a `Result` recorded as `{"Ok": v}` or `{"Err": "message"}`.
///
/// Mirror of `recording::record_result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    let output = next_output(replayer, port, method);
    if let Some(err) = output.get("Err") {
        return Err(err.as_str().unwrap_or("unknown error").to_string().into());
    }
    let value = output.get("Ok").cloned().unwrap_or(output);
    serde_json::from_value(value)
        .map_err(|e| format!("{port}::{method}: failed to deserialize: {e}").into())
}

#[cfg(test)]
pub(crate) fn replayer_of(
    interactions: Vec<crate::cassette::format::Interaction>,
) -> CassetteReplayer {
    let cassette = crate::cassette::format::Cassette {
        name: "test".into(),
        recorded_at: chrono::Utc::now(),
        version: "0.0.0".into(),
        interactions,
    };
    CassetteReplayer::new(&cassette)
}
