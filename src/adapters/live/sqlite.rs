//! SQLite-backed credential, page and report storage.
//!
//! One connection serves all three store ports. Tables:
//!
//! ```text
//! keys_new        current credentials (id, u_n, a_k, a_s), all sealed
//! access_keys     legacy credentials  (user_name, access_key, access_secret)
//! qids            source title -> entity id
//! categories      campaign -> category
//! pages           publication targets in article space
//! pages_users     publication targets in user space
//! publish_reports audit rows
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::ports::credentials::{CredentialStore, EncryptedPair, PrincipalRow};
use crate::ports::pages::{PageStore, PageTarget, TargetTable};
use crate::ports::reports::{AuditRecord, ReportRow, ReportTable};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS keys_new (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    u_n TEXT NOT NULL,
    a_k TEXT NOT NULL,
    a_s TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS access_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT NOT NULL UNIQUE,
    access_key TEXT NOT NULL,
    access_secret TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS qids (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    qid TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL DEFAULT '',
    category2 TEXT NOT NULL DEFAULT '',
    campaign TEXT NOT NULL DEFAULT '',
    depth INTEGER NOT NULL DEFAULT 0,
    def INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    word INTEGER,
    translate_type TEXT,
    cat TEXT,
    lang TEXT,
    user TEXT,
    target TEXT,
    pupdate TEXT,
    add_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted INTEGER NOT NULL DEFAULT 0,
    mdwiki_revid TEXT
);
CREATE INDEX IF NOT EXISTS idx_pages_title ON pages(title);
CREATE TABLE IF NOT EXISTS pages_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    word INTEGER,
    translate_type TEXT,
    cat TEXT,
    lang TEXT,
    user TEXT,
    target TEXT,
    pupdate TEXT,
    add_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted INTEGER NOT NULL DEFAULT 0,
    mdwiki_revid TEXT
);
CREATE INDEX IF NOT EXISTS idx_pages_users_title ON pages_users(title);
CREATE TABLE IF NOT EXISTS publish_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    title TEXT NOT NULL,
    user TEXT NOT NULL,
    lang TEXT NOT NULL,
    sourcetitle TEXT NOT NULL,
    result TEXT NOT NULL,
    data TEXT NOT NULL CHECK (json_valid(data))
);
";

/// Shared SQLite connection implementing every relational port.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Records the entity id for a source title.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_qid(
        &self,
        title: &str,
        qid: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock()?.execute("INSERT INTO qids (title, qid) VALUES (?1, ?2)", params![title, qid])?;
        Ok(())
    }

    /// Maps a campaign to a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_category(
        &self,
        campaign: &str,
        category: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock()?.execute(
            "INSERT INTO categories (campaign, category) VALUES (?1, ?2)",
            params![campaign, category],
        )?;
        Ok(())
    }

    /// Counts rows in a target table matching (title, lang, user).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_targets(
        &self,
        table: TargetTable,
        title: &str,
        lang: &str,
        user: &str,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE title = ?1 AND lang = ?2 AND user = ?3",
            table.table_name()
        );
        Ok(self.lock()?.query_row(&sql, params![title, lang, user], |row| row.get(0))?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Box<dyn std::error::Error + Send + Sync>> {
        self.conn.lock().map_err(|_| "sqlite connection lock poisoned".into())
    }
}

impl CredentialStore for SqliteStore {
    fn current_principals(
        &self,
    ) -> Result<Vec<PrincipalRow>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, u_n FROM keys_new ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok(PrincipalRow { id: row.get(0)?, encrypted_name: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn current_pair(
        &self,
        id: i64,
    ) -> Result<Option<EncryptedPair>, Box<dyn std::error::Error + Send + Sync>> {
        let pair = self
            .lock()?
            .query_row("SELECT a_k, a_s FROM keys_new WHERE id = ?1", params![id], |row| {
                Ok(EncryptedPair { access_key: row.get(0)?, access_secret: row.get(1)? })
            })
            .optional()?;
        Ok(pair)
    }

    fn legacy_pair(
        &self,
        principal: &str,
    ) -> Result<Option<EncryptedPair>, Box<dyn std::error::Error + Send + Sync>> {
        let pair = self
            .lock()?
            .query_row(
                "SELECT access_key, access_secret FROM access_keys WHERE user_name = ?1",
                params![principal],
                |row| Ok(EncryptedPair { access_key: row.get(0)?, access_secret: row.get(1)? }),
            )
            .optional()?;
        Ok(pair)
    }

    fn insert_current(
        &self,
        encrypted_name: &str,
        pair: &EncryptedPair,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO keys_new (u_n, a_k, a_s) VALUES (?1, ?2, ?3)",
            params![encrypted_name, pair.access_key, pair.access_secret],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn upsert_legacy(
        &self,
        principal: &str,
        pair: &EncryptedPair,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock()?.execute(
            "INSERT INTO access_keys (user_name, access_key, access_secret) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_name) DO UPDATE SET
                 access_key = excluded.access_key,
                 access_secret = excluded.access_secret",
            params![principal, pair.access_key, pair.access_secret],
        )?;
        Ok(())
    }

    fn delete_current(&self, id: i64) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let removed = self.lock()?.execute("DELETE FROM keys_new WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

impl PageStore for SqliteStore {
    fn qid_for_title(
        &self,
        title: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let qid = self
            .lock()?
            .query_row(
                "SELECT qid FROM qids WHERE title = ?1 ORDER BY id LIMIT 1",
                params![title],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(qid)
    }

    fn campaign_categories(
        &self,
    ) -> Result<HashMap<String, String>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT campaign, category FROM categories ORDER BY id")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(pairs)
    }

    fn target_exists(
        &self,
        title: &str,
        lang: &str,
        user: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let found = self
            .lock()?
            .query_row(
                "SELECT 1 FROM (
                     SELECT 1 FROM pages
                     WHERE title = ?1 AND lang = ?2 AND user = ?3 AND target != ''
                     UNION
                     SELECT 1 FROM pages_users
                     WHERE title = ?1 AND lang = ?2 AND user = ?3 AND target != ''
                 ) LIMIT 1",
                params![title, lang, user],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn find_target(
        &self,
        table: TargetTable,
        title: &str,
        lang: &str,
        user: &str,
    ) -> Result<Option<PageTarget>, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "SELECT title, COALESCE(word, 0), COALESCE(translate_type, ''), COALESCE(cat, ''),
                    lang, user, COALESCE(target, ''), COALESCE(pupdate, ''),
                    COALESCE(mdwiki_revid, '')
             FROM {} WHERE title = ?1 AND lang = ?2 AND user = ?3
             ORDER BY id LIMIT 1",
            table.table_name()
        );
        let row = self
            .lock()?
            .query_row(&sql, params![title, lang, user], |row| {
                Ok(PageTarget {
                    title: row.get(0)?,
                    word: row.get(1)?,
                    translate_type: row.get(2)?,
                    category: row.get(3)?,
                    lang: row.get(4)?,
                    user: row.get(5)?,
                    target: row.get(6)?,
                    pupdate: row.get(7)?,
                    revid: row.get(8)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn fill_empty_target(
        &self,
        table: TargetTable,
        row: &PageTarget,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "UPDATE {} SET target = ?1, pupdate = ?2
             WHERE title = ?3 AND lang = ?4 AND user = ?5 AND (target = '' OR target IS NULL)",
            table.table_name()
        );
        let changed = self.lock()?.execute(
            &sql,
            params![row.target, row.pupdate, row.title, row.lang, row.user],
        )?;
        Ok(changed)
    }

    fn insert_target(
        &self,
        table: TargetTable,
        row: &PageTarget,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "INSERT INTO {} (title, word, translate_type, cat, lang, user, pupdate, target, mdwiki_revid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            table.table_name()
        );
        self.lock()?.execute(
            &sql,
            params![
                row.title,
                row.word,
                row.translate_type,
                row.category,
                row.lang,
                row.user,
                row.pupdate,
                row.target,
                row.revid
            ],
        )?;
        Ok(())
    }
}

impl ReportTable for SqliteStore {
    fn insert_report(
        &self,
        record: &AuditRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serde_json::to_string(&record.payload)?;
        let result = record.category.strip_suffix(".json").unwrap_or(&record.category);
        self.lock()?.execute(
            "INSERT INTO publish_reports (date, title, user, lang, sourcetitle, result, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                record.title,
                record.user,
                record.lang,
                record.source_title,
                result,
                data
            ],
        )?;
        Ok(())
    }

    fn recent_reports(
        &self,
        limit: usize,
    ) -> Result<Vec<ReportRow>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, title, user, lang, sourcetitle, result, data
             FROM publish_reports ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ReportRow {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    title: row.get(2)?,
                    user: row.get(3)?,
                    lang: row.get(4)?,
                    sourcetitle: row.get(5)?,
                    result: row.get(6)?,
                    data: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn target(title: &str, user: &str, target: &str) -> PageTarget {
        PageTarget {
            title: title.into(),
            word: 120,
            translate_type: "lead".into(),
            category: "RTT".into(),
            lang: "fr".into(),
            user: user.into(),
            target: target.into(),
            pupdate: "2024-05-01".into(),
            revid: "1234".into(),
        }
    }

    #[test]
    fn current_and_legacy_credentials_are_separate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let pair = EncryptedPair { access_key: "k".into(), access_secret: "s".into() };

        let id = store.insert_current("sealed-name", &pair).unwrap();
        store.upsert_legacy("Alice", &pair).unwrap();

        let rows = store.current_principals().unwrap();
        assert_eq!(rows, vec![PrincipalRow { id, encrypted_name: "sealed-name".into() }]);
        assert_eq!(store.current_pair(id).unwrap(), Some(pair.clone()));
        assert_eq!(store.legacy_pair("Alice").unwrap(), Some(pair));
        assert_eq!(store.legacy_pair("Bob").unwrap(), None);

        assert!(store.delete_current(id).unwrap());
        assert!(!store.delete_current(id).unwrap());
    }

    #[test]
    fn first_qid_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.qid_for_title("Foo").unwrap(), None);
        store.insert_qid("Foo", "Q1").unwrap();
        store.insert_qid("Foo", "Q2").unwrap();
        assert_eq!(store.qid_for_title("Foo").unwrap(), Some("Q1".into()));
    }

    #[test]
    fn exists_spans_both_tables_but_ignores_empty_targets() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_target(TargetTable::Pages, &target("Foo", "Alice", "")).unwrap();
        assert!(!store.target_exists("Foo", "fr", "Alice").unwrap());

        store
            .insert_target(TargetTable::UserPages, &target("Foo", "Alice", "User:Alice/Foo"))
            .unwrap();
        assert!(store.target_exists("Foo", "fr", "Alice").unwrap());
        assert!(!store.target_exists("Foo", "de", "Alice").unwrap());
    }

    #[test]
    fn fill_only_touches_empty_targets() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_target(TargetTable::Pages, &target("Foo", "Alice", "")).unwrap();

        let first = target("Foo", "Alice", "Foo (fr)");
        assert_eq!(store.fill_empty_target(TargetTable::Pages, &first).unwrap(), 1);

        let second = target("Foo", "Alice", "Something else");
        assert_eq!(store.fill_empty_target(TargetTable::Pages, &second).unwrap(), 0);

        let row = store.find_target(TargetTable::Pages, "Foo", "fr", "Alice").unwrap().unwrap();
        assert_eq!(row.target, "Foo (fr)");
    }

    #[test]
    fn reports_strip_json_suffix_and_list_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut record = AuditRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            title: "Foo".into(),
            user: "Alice".into(),
            lang: "fr".into(),
            source_title: "Foo".into(),
            category: "errors.json".into(),
            payload: json!({"a": 1}),
        };
        store.insert_report(&record).unwrap();
        record.category = "success".into();
        store.insert_report(&record).unwrap();

        let rows = store.recent_reports(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].result, "success");
        assert_eq!(rows[1].result, "errors");
        assert_eq!(rows[1].date, "2024-05-01 12:00:00");
        assert_eq!(rows[1].data, r#"{"a":1}"#);
    }

    #[test]
    fn categories_map_campaigns() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_category("main", "RTT").unwrap();
        let cats = store.campaign_categories().unwrap();
        assert_eq!(cats.get("main").map(String::as_str), Some("RTT"));
    }
}
