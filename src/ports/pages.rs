//! Page store port: publication targets, entity ids and campaign categories.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The two destination tables for publication targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTable {
    /// `pages`: translations published into article space.
    Pages,
    /// `pages_users`: translations published into a user's own space.
    UserPages,
}

impl TargetTable {
    /// SQL table name.
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::UserPages => "pages_users",
        }
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// One publication-target row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    /// Source article title.
    pub title: String,
    /// Word count of the source article at insert time.
    pub word: i64,
    /// Translation type, e.g. `lead`.
    pub translate_type: String,
    /// Campaign category.
    pub category: String,
    /// Target language code.
    pub lang: String,
    /// Translating principal.
    pub user: String,
    /// Published page title; empty until the first publish lands.
    pub target: String,
    /// Date the target was set (`YYYY-MM-DD`).
    pub pupdate: String,
    /// Source revision id the translation was made from.
    pub revid: String,
}

/// Relational access to targets and their reference tables.
pub trait PageStore: Send + Sync {
    /// Looks up the entity id recorded for a source title.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference table cannot be queried.
    fn qid_for_title(
        &self,
        title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Maps every campaign name to its category.
    ///
    /// # Errors
    ///
    /// Returns an error if the categories table cannot be queried.
    fn campaign_categories(
        &self,
    ) -> Result<HashMap<String, String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Whether either target table holds a row for (title, lang, user)
    /// with a non-empty target.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn target_exists(
        &self,
        title: &str,
        lang: &str,
        user: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Fetches the row for (title, lang, user) from one table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_target(
        &self,
        table: TargetTable,
        title: &str,
        lang: &str,
        user: &str,
    ) -> Result<Option<PageTarget>, Box<dyn std::error::Error + Send + Sync>>;

    /// Sets `target` and `pupdate` on the (title, lang, user) row, but only
    /// where the stored target is empty. Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn fill_empty_target(
        &self,
        table: TargetTable,
        row: &PageTarget,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;

    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_target(
        &self,
        table: TargetTable,
        row: &PageTarget,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
