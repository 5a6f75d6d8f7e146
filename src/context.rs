//! Service context bundling all port trait objects.

use std::collections::HashMap;
use std::path::Path;

use crate::adapters::live::cipher::AesGcmCipher;
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::edit::HttpEditService;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::link::HttpLinkService;
use crate::adapters::live::mediawiki::ActionClient;
use crate::adapters::live::revisions::SnapshotRevisionDirectory;
use crate::adapters::live::sqlite::SqliteStore;
use crate::adapters::live::text::PassthroughNormalizer;
use crate::adapters::recording::{
    RecordingClock, RecordingEditService, RecordingIdGenerator, RecordingLinkService,
    RecordingRevisionDirectory,
};
use crate::adapters::replaying::{
    ReplayingClock, ReplayingEditService, ReplayingIdGenerator, ReplayingLinkService,
    ReplayingRevisionDirectory,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::Settings;
use crate::ports::{
    AuditRecord, Cipher, Clock, CredentialPair, CredentialStore, EditRequest, EditService,
    EncryptedPair, FileSystem, IdGenerator, KeyContext, LinkService, PageStore, PageTarget,
    PrincipalRow, ReportRow, ReportTable, RevisionDirectory, SiteLinkRequest, TargetTable,
    TextNormalizer,
};

type PortResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors wire
/// up live, recording or replaying adapters; tests swap individual fields.
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Box<dyn Clock>,
    /// Filesystem used by the audit file sink and snapshots.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for the per-process report directory.
    pub id_gen: Box<dyn IdGenerator>,
    /// Cipher for sealed credential columns.
    pub cipher: Box<dyn Cipher>,
    /// Both credential table generations.
    pub credentials: Box<dyn CredentialStore>,
    /// Wiki edit submission.
    pub edits: Box<dyn EditService>,
    /// Knowledge-base site-links.
    pub links: Box<dyn LinkService>,
    /// Entity ids, campaign categories and publication targets.
    pub pages: Box<dyn PageStore>,
    /// Audit table sink.
    pub reports: Box<dyn ReportTable>,
    /// Source revision lookup.
    pub revisions: Box<dyn RevisionDirectory>,
    /// Text rewriting before submission.
    pub normalizer: Box<dyn TextNormalizer>,
}

impl ServiceContext {
    /// Creates a live context: SQLite store, AES-GCM cipher and HTTP
    /// clients built from `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if a cipher key is missing or malformed, the database
    /// cannot be opened, or the HTTP client cannot be built.
    pub fn live(settings: &Settings) -> Result<Self, String> {
        let (cookie_key, decrypt_key) = settings.cipher_keys().map_err(|e| e.to_string())?;
        let cipher = AesGcmCipher::from_base64(cookie_key, decrypt_key)?;
        let store = SqliteStore::open(&settings.db_path).map_err(|e| {
            format!("Failed to open database {}: {e}", settings.db_path.display())
        })?;
        let client = ActionClient::new(settings.http_timeout, &settings.user_agent)
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        tracing::debug!(db = %settings.db_path.display(), "live context ready");

        Ok(Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator),
            cipher: Box::new(cipher),
            credentials: Box::new(store.clone()),
            edits: Box::new(HttpEditService::new(client.clone(), &settings.wiki_api)),
            links: Box::new(HttpLinkService::new(client.clone(), &settings.wikidata_api)),
            pages: Box::new(store.clone()),
            reports: Box::new(store),
            revisions: Box::new(SnapshotRevisionDirectory::new(
                Box::new(LiveFileSystem),
                settings.revids_snapshot.clone(),
                client,
                &settings.revids_api,
            )),
            normalizer: Box::new(PassthroughNormalizer),
        })
    }

    /// Creates a live context whose network, clock and id ports are
    /// recorded into a new session under `root`.
    ///
    /// Drop the context before calling [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the live context or the session cannot be created.
    pub fn recording_at(
        settings: &Settings,
        root: &Path,
    ) -> Result<(Self, RecordingSession), String> {
        let live = Self::live(settings)?;
        let session = RecordingSession::new(root)?;

        let ctx = Self {
            clock: Box::new(RecordingClock::new(live.clock, session.clock.clone())),
            id_gen: Box::new(RecordingIdGenerator::new(live.id_gen, session.id_gen.clone())),
            edits: Box::new(RecordingEditService::new(live.edits, session.edit.clone())),
            links: Box::new(RecordingLinkService::new(live.links, session.link.clone())),
            revisions: Box::new(RecordingRevisionDirectory::new(
                live.revisions,
                session.revisions.clone(),
            )),
            ..live
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from the cassettes of a recording
    /// session directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette file cannot be read or parsed.
    pub fn replaying(dir: &Path) -> Result<Self, String> {
        Self::replaying_from(&CassetteConfig::from_dir(dir))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Recorded ports without a cassette, and every local store port, use a
    /// panicking adapter until a test or caller swaps in a real one (see
    /// [`ServiceContext::with_store`]).
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            clock: match replayers.clock {
                Some(r) => Box::new(ReplayingClock::new(r)),
                None => Box::new(Unconfigured),
            },
            id_gen: match replayers.id_gen {
                Some(r) => Box::new(ReplayingIdGenerator::new(r)),
                None => Box::new(Unconfigured),
            },
            edits: match replayers.edit {
                Some(r) => Box::new(ReplayingEditService::new(r)),
                None => Box::new(Unconfigured),
            },
            links: match replayers.link {
                Some(r) => Box::new(ReplayingLinkService::new(r)),
                None => Box::new(Unconfigured),
            },
            revisions: match replayers.revisions {
                Some(r) => Box::new(ReplayingRevisionDirectory::new(r)),
                None => Box::new(Unconfigured),
            },
            ..Self::unconfigured()
        })
    }

    /// A context in which every port panics when used.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            clock: Box::new(Unconfigured),
            fs: Box::new(Unconfigured),
            id_gen: Box::new(Unconfigured),
            cipher: Box::new(Unconfigured),
            credentials: Box::new(Unconfigured),
            edits: Box::new(Unconfigured),
            links: Box::new(Unconfigured),
            pages: Box::new(Unconfigured),
            reports: Box::new(Unconfigured),
            revisions: Box::new(Unconfigured),
            normalizer: Box::new(Unconfigured),
        }
    }

    /// Points the credential, page and report ports at one SQLite store.
    #[must_use]
    pub fn with_store(self, store: &SqliteStore) -> Self {
        Self {
            credentials: Box::new(store.clone()),
            pages: Box::new(store.clone()),
            reports: Box::new(store.clone()),
            ..self
        }
    }
}

// --- Panicking adapter for unconfigured ports ---

struct Unconfigured;

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in this context (no cassette or adapter loaded)");
}

impl Clock for Unconfigured {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        unconfigured("Clock")
    }
}

impl IdGenerator for Unconfigured {
    fn generate_id(&self) -> String {
        unconfigured("IdGenerator")
    }
}

impl FileSystem for Unconfigured {
    fn read_to_string(&self, _path: &Path) -> PortResult<String> {
        unconfigured("FileSystem")
    }
    fn append(&self, _path: &Path, _contents: &str) -> PortResult<()> {
        unconfigured("FileSystem")
    }
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("FileSystem")
    }
}

impl Cipher for Unconfigured {
    fn encrypt(&self, _value: &str, _context: KeyContext) -> PortResult<String> {
        unconfigured("Cipher")
    }
    fn decrypt(&self, _value: &str, _context: KeyContext) -> PortResult<String> {
        unconfigured("Cipher")
    }
}

impl CredentialStore for Unconfigured {
    fn current_principals(&self) -> PortResult<Vec<PrincipalRow>> {
        unconfigured("CredentialStore")
    }
    fn current_pair(&self, _id: i64) -> PortResult<Option<EncryptedPair>> {
        unconfigured("CredentialStore")
    }
    fn legacy_pair(&self, _principal: &str) -> PortResult<Option<EncryptedPair>> {
        unconfigured("CredentialStore")
    }
    fn insert_current(&self, _encrypted_name: &str, _pair: &EncryptedPair) -> PortResult<i64> {
        unconfigured("CredentialStore")
    }
    fn upsert_legacy(&self, _principal: &str, _pair: &EncryptedPair) -> PortResult<()> {
        unconfigured("CredentialStore")
    }
    fn delete_current(&self, _id: i64) -> PortResult<bool> {
        unconfigured("CredentialStore")
    }
}

impl EditService for Unconfigured {
    fn submit(
        &self,
        _request: &EditRequest,
        _credentials: &CredentialPair,
    ) -> PortResult<serde_json::Value> {
        unconfigured("EditService")
    }
}

impl LinkService for Unconfigured {
    fn set_sitelink(
        &self,
        _request: &SiteLinkRequest,
        _credentials: &CredentialPair,
    ) -> PortResult<serde_json::Value> {
        unconfigured("LinkService")
    }
}

impl PageStore for Unconfigured {
    fn qid_for_title(&self, _title: &str) -> PortResult<Option<String>> {
        unconfigured("PageStore")
    }
    fn campaign_categories(&self) -> PortResult<HashMap<String, String>> {
        unconfigured("PageStore")
    }
    fn target_exists(&self, _title: &str, _lang: &str, _user: &str) -> PortResult<bool> {
        unconfigured("PageStore")
    }
    fn find_target(
        &self,
        _table: TargetTable,
        _title: &str,
        _lang: &str,
        _user: &str,
    ) -> PortResult<Option<PageTarget>> {
        unconfigured("PageStore")
    }
    fn fill_empty_target(&self, _table: TargetTable, _row: &PageTarget) -> PortResult<usize> {
        unconfigured("PageStore")
    }
    fn insert_target(&self, _table: TargetTable, _row: &PageTarget) -> PortResult<()> {
        unconfigured("PageStore")
    }
}

impl ReportTable for Unconfigured {
    fn insert_report(&self, _record: &AuditRecord) -> PortResult<()> {
        unconfigured("ReportTable")
    }
    fn recent_reports(&self, _limit: usize) -> PortResult<Vec<ReportRow>> {
        unconfigured("ReportTable")
    }
}

impl RevisionDirectory for Unconfigured {
    fn revision_for(&self, _title: &str) -> PortResult<Option<String>> {
        unconfigured("RevisionDirectory")
    }
}

impl TextNormalizer for Unconfigured {
    fn normalize(
        &self,
        _source_title: &str,
        _title: &str,
        _text: &str,
        _lang: &str,
        _revid: &str,
    ) -> PortResult<String> {
        unconfigured("TextNormalizer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            version: "0.0.0".into(),
            interactions,
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    #[test]
    fn replaying_from_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_cassette(
            &dir.path().join("clock.cassette.yaml"),
            vec![Interaction {
                seq: 0,
                port: "clock".into(),
                method: "now".into(),
                input: json!(null),
                output: json!("2024-06-15T10:30:00Z"),
            }],
        );
        write_cassette(
            &dir.path().join("revisions.cassette.yaml"),
            vec![Interaction {
                seq: 0,
                port: "revisions".into(),
                method: "revision_for".into(),
                input: json!({"title": "Foo"}),
                output: json!({"Ok": "77"}),
            }],
        );

        let ctx = ServiceContext::replaying(dir.path()).unwrap();
        assert_eq!(ctx.clock.now().to_rfc3339(), "2024-06-15T10:30:00+00:00");
        assert_eq!(ctx.revisions.revision_for("Foo").unwrap(), Some("77".into()));
    }

    #[test]
    fn with_store_wires_all_store_ports() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_qid("Foo", "Q42").unwrap();
        let ctx = ServiceContext::unconfigured().with_store(&store);
        assert_eq!(ctx.pages.qid_for_title("Foo").unwrap(), Some("Q42".into()));
        assert!(ctx.reports.recent_reports(5).unwrap().is_empty());
        assert!(ctx.credentials.current_principals().unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "not configured")]
    fn unconfigured_port_panics_with_clear_message() {
        let ctx = ServiceContext::replaying_from(&CassetteConfig::panic_on_unspecified()).unwrap();
        let _ = ctx.clock.now();
    }

    #[test]
    fn live_requires_cipher_keys() {
        let err = ServiceContext::live(&Settings::default()).err().unwrap();
        assert!(err.contains("PUBLISH_COOKIE_KEY"));
    }
}
