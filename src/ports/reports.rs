//! Report table port: the relational audit sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One outcome of one logical occurrence, as handed to the audit writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the outcome was decided.
    pub timestamp: DateTime<Utc>,
    /// Published page title.
    pub title: String,
    /// Acting principal.
    pub user: String,
    /// Target language code.
    pub lang: String,
    /// Source article title.
    pub source_title: String,
    /// Outcome category (`success`, `captcha`, `noaccess`, an error category).
    pub category: String,
    /// Full payload snapshot.
    pub payload: serde_json::Value,
}

/// A stored report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Row id.
    pub id: i64,
    /// Insert timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub date: String,
    /// Published page title.
    pub title: String,
    /// Acting principal.
    pub user: String,
    /// Target language code.
    pub lang: String,
    /// Source article title.
    pub sourcetitle: String,
    /// Outcome category.
    pub result: String,
    /// Payload as JSON text.
    pub data: String,
}

/// Append-only access to the `publish_reports` table.
pub trait ReportTable: Send + Sync {
    /// Appends one row for `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the insert fails.
    fn insert_report(
        &self,
        record: &AuditRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns the most recent rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn recent_reports(
        &self,
        limit: usize,
    ) -> Result<Vec<ReportRow>, Box<dyn std::error::Error + Send + Sync>>;
}
