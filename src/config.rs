//! Runtime settings read from `PUBLISH_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "mdpublish/0.1 (translation publishing; https://example.com/mdpublish)";

/// All tunables for a running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SQLite database holding credentials, targets and reports.
    pub db_path: PathBuf,
    /// Root directory of the audit file sink.
    pub reports_dir: PathBuf,
    /// Group directory directly under `reports_dir`.
    pub report_group: String,
    /// Wiki action API; `{lang}` is replaced by the target language.
    pub wiki_api: String,
    /// Knowledge-base action API.
    pub wikidata_api: String,
    /// Local `title -> revid` snapshot.
    pub revids_snapshot: PathBuf,
    /// Remote revision lookup endpoint.
    pub revids_api: String,
    /// `title -> word count` snapshot.
    pub words_snapshot: PathBuf,
    /// Base64 key for the "cookie" key context.
    pub cookie_key: Option<String>,
    /// Base64 key for the "decrypt" key context.
    pub decrypt_key: Option<String>,
    /// Principal used for the one-shot link retry.
    pub fallback_user: String,
    /// Hashtag appended to edit summaries.
    pub hashtag: String,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout: Duration,
    /// User agent for outbound HTTP calls.
    pub user_agent: String,
    /// Listen address for `serve`.
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("publish.sqlite3"),
            reports_dir: PathBuf::from("publish_reports"),
            report_group: "reports_by_day".to_string(),
            wiki_api: "https://{lang}.wikipedia.org/w/api.php".to_string(),
            wikidata_api: "https://www.wikidata.org/w/api.php".to_string(),
            revids_snapshot: PathBuf::from("all_pages_revids.json"),
            revids_api: "https://mdwiki.toolforge.org/api.php".to_string(),
            words_snapshot: PathBuf::from("words.json"),
            cookie_key: None,
            decrypt_key: None,
            fallback_user: "Mr. Ibrahem".to_string(),
            hashtag: "#mdwikicx".to_string(),
            http_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, honoring a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |name: &str, default: String| lookup(name).unwrap_or(default);
        let path = |name: &str, default: PathBuf| lookup(name).map_or(default, PathBuf::from);

        let http_timeout = match lookup("PUBLISH_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "PUBLISH_HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.http_timeout,
        };

        Ok(Self {
            db_path: path("PUBLISH_DB_PATH", defaults.db_path),
            reports_dir: path("PUBLISH_REPORTS_DIR", defaults.reports_dir),
            report_group: string("PUBLISH_REPORT_GROUP", defaults.report_group),
            wiki_api: string("PUBLISH_WIKI_API", defaults.wiki_api),
            wikidata_api: string("PUBLISH_WIKIDATA_API", defaults.wikidata_api),
            revids_snapshot: path("PUBLISH_REVIDS_SNAPSHOT", defaults.revids_snapshot),
            revids_api: string("PUBLISH_REVIDS_API", defaults.revids_api),
            words_snapshot: path("PUBLISH_WORDS_SNAPSHOT", defaults.words_snapshot),
            cookie_key: lookup("PUBLISH_COOKIE_KEY").filter(|v| !v.trim().is_empty()),
            decrypt_key: lookup("PUBLISH_DECRYPT_KEY").filter(|v| !v.trim().is_empty()),
            fallback_user: string("PUBLISH_FALLBACK_USER", defaults.fallback_user),
            hashtag: string("PUBLISH_HASHTAG", defaults.hashtag),
            http_timeout,
            user_agent: string("PUBLISH_USER_AGENT", defaults.user_agent),
            bind: string("PUBLISH_BIND", defaults.bind),
        })
    }

    /// Returns both cipher keys, or the name of the first missing one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when either key is unset.
    pub fn cipher_keys(&self) -> Result<(&str, &str), ConfigError> {
        let cookie = self.cookie_key.as_deref().ok_or(ConfigError::Missing("PUBLISH_COOKIE_KEY"))?;
        let decrypt =
            self.decrypt_key.as_deref().ok_or(ConfigError::Missing("PUBLISH_DECRYPT_KEY"))?;
        Ok((cookie, decrypt))
    }
}
