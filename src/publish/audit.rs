//! Best-effort audit persistence to a file tree and the reports table.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::PublishError;
use crate::ports::{AuditRecord, Clock, FileSystem, IdGenerator, ReportTable};

/// Per-process report directory, fixed when the process starts.
///
/// The date in the path is the start date, so a process that runs past
/// midnight keeps writing into the earlier day's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDirectory {
    path: PathBuf,
}

impl ReportDirectory {
    /// Resolves `<root>/<group>/<Y>/<m>/<d>/<unix>-<12 hex>` from the
    /// current time and a fresh id.
    #[must_use]
    pub fn resolve(root: &Path, group: &str, clock: &dyn Clock, ids: &dyn IdGenerator) -> Self {
        let now = clock.now();
        let id = ids.generate_id();
        let short: String = id.chars().filter(char::is_ascii_hexdigit).take(12).collect();
        let path = root
            .join(group)
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(now.format("%d").to_string())
            .join(format!("{}-{short}", now.timestamp()));
        tracing::info!(dir = %path.display(), "audit report directory");
        Self { path }
    }

    /// The resolved directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes each record to both sinks independently.
pub struct AuditWriter<'a> {
    fs: &'a dyn FileSystem,
    table: &'a dyn ReportTable,
    dir: &'a Path,
}

impl<'a> AuditWriter<'a> {
    /// Creates a writer for a resolved report directory.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem, table: &'a dyn ReportTable, dir: &'a Path) -> Self {
        Self { fs, table, dir }
    }

    /// Persists `record`. Sink failures are logged and never returned.
    pub fn write(&self, record: &AuditRecord) {
        if let Err(e) = self.write_file(record) {
            let err = PublishError::Persistence { sink: "file", message: e.to_string() };
            tracing::warn!(category = %record.category, error = %err, "audit write failed");
        }
        if let Err(e) = self.table.insert_report(record) {
            let err = PublishError::Persistence { sink: "table", message: e.to_string() };
            tracing::warn!(category = %record.category, error = %err, "audit write failed");
        }
    }

    fn write_file(
        &self,
        record: &AuditRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut document = match &record.payload {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("payload".to_string(), other.clone());
                map
            }
        };
        document.insert("time".to_string(), json!(record.timestamp.timestamp()));
        document.insert(
            "time_date".to_string(),
            json!(record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        );
        let mut line = serde_json::to_string(&Value::Object(document))?;
        line.push('\n');
        self.fs.append(&self.dir.join(format!("{}.json", record.category)), &line)
    }
}
