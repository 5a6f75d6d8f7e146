//! Idempotent recording of publication targets.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;

use crate::ports::filesystem::read_snapshot;
use crate::ports::{Clock, FileSystem, PageStore, PageTarget, TargetTable};

/// Process-lifetime `title -> word count` table, loaded on first use.
#[derive(Debug, Default)]
pub struct WordCounts {
    table: OnceLock<HashMap<String, i64>>,
}

impl WordCounts {
    /// Creates an unloaded table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table, reading `path` the first time.
    ///
    /// A missing or malformed snapshot yields an empty table.
    pub fn get_or_load(&self, fs: &dyn FileSystem, path: &Path) -> &HashMap<String, i64> {
        self.table.get_or_init(|| {
            read_snapshot(fs, path, "word-count")
                .map(|raw| parse_word_counts(&raw))
                .unwrap_or_default()
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_word_counts(raw: &str) -> HashMap<String, i64> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
        tracing::warn!("word-count snapshot is not a JSON object");
        return HashMap::new();
    };
    map.into_iter()
        .filter_map(|(title, v)| {
            let count = match v {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            count.map(|c| (title, c))
        })
        .collect()
}

/// One target to record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertRequest {
    /// Source article title.
    pub title: String,
    /// Translation type, e.g. `lead`.
    pub translate_type: String,
    /// Campaign category.
    pub category: String,
    /// Target language code.
    pub lang: String,
    /// Principal name.
    pub user: String,
    /// Logs the routed insert at info level.
    pub test: bool,
    /// Published page title.
    pub target: String,
    /// Route to the user table regardless of the target.
    pub force_user_table: bool,
    /// Source revision id.
    pub revid: String,
}

/// What an upsert did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// Table the row was routed to; `None` when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TargetTable>,
    /// Whether the routing went to the user table.
    pub routed_to_user_table: bool,
    /// Whether routing was forced by the caller.
    pub forced: bool,
    /// A row for (title, lang, user) was already in the routed table.
    pub already_existed: bool,
    /// A new row was inserted.
    pub wrote: bool,
    /// Why nothing was recorded, if a required field was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

/// Records publication targets into the pages or user-pages table.
pub struct TargetUpsert<'a> {
    pages: &'a dyn PageStore,
    clock: &'a dyn Clock,
    words: &'a HashMap<String, i64>,
}

impl<'a> TargetUpsert<'a> {
    /// Creates an upsert over the store with a loaded word-count table.
    #[must_use]
    pub fn new(
        pages: &'a dyn PageStore,
        clock: &'a dyn Clock,
        words: &'a HashMap<String, i64>,
    ) -> Self {
        Self { pages, clock, words }
    }

    /// Inserts the target, or fills an empty target on the existing row.
    ///
    /// A stored non-empty target is never overwritten. Store errors are
    /// logged; the outcome then reports nothing written.
    #[must_use]
    pub fn upsert(&self, request: &UpsertRequest) -> UpsertOutcome {
        let title = request.title.replace('_', " ");
        let target = request.target.replace('_', " ");
        let user = request.user.replace('_', " ");
        let lang = request.lang.as_str();

        let mut outcome =
            UpsertOutcome { forced: request.force_user_table, ..UpsertOutcome::default() };
        if user.is_empty() || title.is_empty() || lang.is_empty() {
            outcome.validation_error =
                Some(format!("one_empty: title={title:?} lang={lang:?} user={user:?}"));
            return outcome;
        }

        let table = route(&target, &user, request.force_user_table);
        outcome.table = Some(table);
        outcome.routed_to_user_table = table == TargetTable::UserPages;

        let row = PageTarget {
            word: self.words.get(&title).copied().unwrap_or(0),
            translate_type: request.translate_type.clone(),
            category: request.category.clone(),
            lang: lang.to_string(),
            user: user.clone(),
            target,
            pupdate: self.clock.now().format("%Y-%m-%d").to_string(),
            revid: request.revid.clone(),
            title,
        };

        match self.pages.find_target(table, &row.title, lang, &user) {
            Ok(Some(existing)) => {
                outcome.already_existed = true;
                if existing.target.is_empty() {
                    match self.pages.fill_empty_target(table, &row) {
                        Ok(n) => tracing::debug!(
                            %table,
                            title = %row.title,
                            filled = n,
                            "filled empty target"
                        ),
                        Err(e) => tracing::error!(%table, error = %e, "target update failed"),
                    }
                }
            }
            Ok(None) => {
                if request.test {
                    tracing::info!(
                        %table,
                        title = %row.title,
                        target = %row.target,
                        "inserting target"
                    );
                }
                match self.pages.insert_target(table, &row) {
                    Ok(()) => outcome.wrote = true,
                    Err(e) => tracing::error!(%table, error = %e, "target insert failed"),
                }
            }
            Err(e) => tracing::error!(%table, error = %e, "target lookup failed"),
        }
        outcome
    }

    /// Whether either table holds a non-empty target for (title, lang, user).
    #[must_use]
    pub fn find_exists(&self, title: &str, lang: &str, user: &str) -> bool {
        self.pages
            .target_exists(&title.replace('_', " "), lang, &user.replace('_', " "))
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "target existence check failed");
                false
            })
    }
}

/// User-space targets (those naming the user) go to the user table.
fn route(target: &str, user: &str, force_user_table: bool) -> TargetTable {
    if force_user_table {
        return TargetTable::UserPages;
    }
    let bare = user.replace("User:", "").replace("user:", "");
    if target.contains(&bare) {
        TargetTable::UserPages
    } else {
        TargetTable::Pages
    }
}
