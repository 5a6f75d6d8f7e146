//! Test doubles shared by the publish tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::adapters::live::sqlite::SqliteStore;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::ports::{
    AuditRecord, Cipher, Clock, CredentialPair, EditRequest, EditService, FileSystem, Generation,
    IdGenerator, KeyContext, LinkService, ReportRow, ReportTable, RevisionDirectory,
    SiteLinkRequest, TextNormalizer,
};

type PortResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 2024-05-01 12:00:00 UTC.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock whose time the test moves by hand.
#[derive(Clone)]
pub struct SharedClock(pub Arc<Mutex<DateTime<Utc>>>);

impl SharedClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(time)))
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.0.lock().unwrap() = time;
    }
}

impl Clock for SharedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct FixedIds(pub &'static str);

impl IdGenerator for FixedIds {
    fn generate_id(&self) -> String {
        self.0.to_string()
    }
}

/// Reversible "cipher" that tags values with their key context.
pub struct PlainCipher;

impl Cipher for PlainCipher {
    fn encrypt(&self, value: &str, context: KeyContext) -> PortResult<String> {
        Ok(format!("{context}:{value}"))
    }

    fn decrypt(&self, value: &str, context: KeyContext) -> PortResult<String> {
        value
            .strip_prefix(&format!("{context}:"))
            .map(str::to_string)
            .ok_or_else(|| format!("not sealed under {context}").into())
    }
}

#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl MemFs {
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.lock().unwrap().insert(path.into(), contents.to_string());
        self
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> PortResult<String> {
        self.contents(path).ok_or_else(|| format!("no such file: {}", path.display()).into())
    }

    fn append(&self, path: &Path, contents: &str) -> PortResult<()> {
        self.files.lock().unwrap().entry(path.to_path_buf()).or_default().push_str(contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

/// Filesystem whose writes always fail.
pub struct BrokenFs;

impl FileSystem for BrokenFs {
    fn read_to_string(&self, _path: &Path) -> PortResult<String> {
        Err("disk gone".into())
    }

    fn append(&self, _path: &Path, _contents: &str) -> PortResult<()> {
        Err("disk gone".into())
    }

    fn exists(&self, _path: &Path) -> bool {
        false
    }
}

/// Report table whose inserts always fail.
pub struct BrokenReports;

impl ReportTable for BrokenReports {
    fn insert_report(&self, _record: &AuditRecord) -> PortResult<()> {
        Err("database is locked".into())
    }

    fn recent_reports(&self, _limit: usize) -> PortResult<Vec<ReportRow>> {
        Err("database is locked".into())
    }
}

/// Edit service answering from a script and remembering each call.
#[derive(Clone)]
pub struct ScriptedEdits {
    responses: Arc<Mutex<VecDeque<Result<Value, String>>>>,
    calls: Arc<Mutex<Vec<(EditRequest, String)>>>,
}

impl ScriptedEdits {
    pub fn new(responses: Vec<Result<Value, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests submitted so far, with the acting principal.
    pub fn calls(&self) -> Vec<(EditRequest, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl EditService for ScriptedEdits {
    fn submit(&self, request: &EditRequest, credentials: &CredentialPair) -> PortResult<Value> {
        self.calls.lock().unwrap().push((request.clone(), credentials.principal.clone()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(e)) => Err(e.into()),
            None => panic!("edit script exhausted"),
        }
    }
}

/// Link service answering from a script and remembering each call.
#[derive(Clone)]
pub struct ScriptedLinks {
    responses: Arc<Mutex<VecDeque<Result<Value, String>>>>,
    calls: Arc<Mutex<Vec<(SiteLinkRequest, String)>>>,
}

impl ScriptedLinks {
    pub fn new(responses: Vec<Result<Value, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests submitted so far, with the acting principal.
    pub fn calls(&self) -> Vec<(SiteLinkRequest, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl LinkService for ScriptedLinks {
    fn set_sitelink(
        &self,
        request: &SiteLinkRequest,
        credentials: &CredentialPair,
    ) -> PortResult<Value> {
        self.calls.lock().unwrap().push((request.clone(), credentials.principal.clone()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(e)) => Err(e.into()),
            None => panic!("link script exhausted"),
        }
    }
}

#[derive(Default)]
pub struct StaticRevisions(pub HashMap<String, String>);

impl RevisionDirectory for StaticRevisions {
    fn revision_for(&self, title: &str) -> PortResult<Option<String>> {
        Ok(self.0.get(title).cloned())
    }
}

/// Appends a marker so tests can see the normalizer ran.
pub struct MarkingNormalizer;

impl TextNormalizer for MarkingNormalizer {
    fn normalize(
        &self,
        _source_title: &str,
        _title: &str,
        text: &str,
        _lang: &str,
        _revid: &str,
    ) -> PortResult<String> {
        Ok(format!("{text}\n<!-- refs fixed -->"))
    }
}

pub fn credentials_for(principal: &str) -> CredentialPair {
    CredentialPair {
        access_key: format!("key-{principal}"),
        access_secret: format!("secret-{principal}"),
        generation: Generation::Current,
        principal: principal.to_string(),
    }
}

/// Stores `key-<principal>` / `secret-<principal>` for a principal.
pub fn seed_credentials(store: &SqliteStore, principal: &str, generation: Generation) {
    crate::publish::credentials::store_credentials(
        store,
        &PlainCipher,
        principal,
        &format!("key-{principal}"),
        &format!("secret-{principal}"),
        generation,
    )
    .unwrap();
}

/// Settings with a fixed report root and empty snapshot paths.
pub fn test_settings() -> Settings {
    Settings {
        reports_dir: PathBuf::from("/reports"),
        words_snapshot: PathBuf::from("/snapshots/words.json"),
        ..Settings::default()
    }
}

/// A fully wired in-memory context plus handles to inspect it.
pub struct Harness {
    pub ctx: ServiceContext,
    pub store: SqliteStore,
    pub fs: MemFs,
    pub edits: ScriptedEdits,
    pub links: ScriptedLinks,
}

impl Harness {
    pub fn new(edits: Vec<Result<Value, String>>, links: Vec<Result<Value, String>>) -> Self {
        let store = SqliteStore::open_in_memory().unwrap();
        let fs = MemFs::default();
        let edits = ScriptedEdits::new(edits);
        let links = ScriptedLinks::new(links);

        let mut ctx = ServiceContext::unconfigured().with_store(&store);
        ctx.clock = Box::new(FixedClock(fixed_time()));
        ctx.id_gen = Box::new(FixedIds("0123456789abcdef0123456789abcdef"));
        ctx.fs = Box::new(fs.clone());
        ctx.cipher = Box::new(PlainCipher);
        ctx.edits = Box::new(edits.clone());
        ctx.links = Box::new(links.clone());
        ctx.revisions = Box::new(StaticRevisions::default());
        ctx.normalizer = Box::new(crate::adapters::live::text::PassthroughNormalizer);

        Self { ctx, store, fs, edits, links }
    }

    /// Moves the wired context out, leaving a panicking one behind.
    pub fn take_ctx(&mut self) -> ServiceContext {
        std::mem::replace(&mut self.ctx, ServiceContext::unconfigured())
    }

    /// Report directory every audit file lands in under [`test_settings`].
    pub fn report_dir() -> PathBuf {
        PathBuf::from("/reports/reports_by_day/2024/05/01/1714564800-0123456789ab")
    }

    /// Parsed documents in `<category>.json` under [`Harness::report_dir`].
    pub fn audit_documents(&self, category: &str) -> Vec<Value> {
        let path = Self::report_dir().join(format!("{category}.json"));
        self.fs
            .contents(&path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}
