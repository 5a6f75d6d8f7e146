//! Inbound publication requests and their normalization.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PublishError;

/// Canonical owner name that known aliases collapse to.
pub const CANONICAL_OWNER: &str = "Mr. Ibrahem";

/// Raw names rewritten to [`CANONICAL_OWNER`] before underscore handling.
const USER_ALIASES: [(&str, &str); 2] =
    [("Mr. Ibrahem 1", CANONICAL_OWNER), ("Admin", CANONICAL_OWNER)];

/// A publication request as posted by the translation tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRequest {
    /// Acting user, possibly an alias.
    #[serde(default)]
    pub user: String,
    /// Title to create on the target wiki.
    #[serde(default)]
    pub title: String,
    /// Title of the source article.
    #[serde(default)]
    pub sourcetitle: String,
    /// Target language code.
    #[serde(default)]
    pub target: String,
    /// Campaign the translation belongs to.
    #[serde(default)]
    pub campaign: String,
    /// Article wikitext.
    #[serde(default)]
    pub text: String,
    /// Client-supplied summary. Ignored; summaries are always generated.
    #[serde(default)]
    pub summary: String,
    /// Source revision the client translated from.
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub revid: Option<String>,
    /// Alternate name for `revid`.
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Captcha id from a previous challenge.
    #[serde(rename = "wpCaptchaId", default, skip_serializing_if = "Option::is_none")]
    pub captcha_id: Option<String>,
    /// Captcha answer.
    #[serde(rename = "wpCaptchaWord", default, skip_serializing_if = "Option::is_none")]
    pub captcha_word: Option<String>,
}

/// A request after aliasing, underscore handling and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// Canonical principal name.
    pub user: String,
    /// Normalized target title.
    pub title: String,
    /// Source article title.
    pub source_title: String,
    /// Target language code.
    pub lang: String,
    /// Campaign name, possibly empty.
    pub campaign: String,
    /// Article wikitext.
    pub text: String,
    /// Client revision hint, used only when the directory has none.
    pub revid_hint: String,
    /// Captcha id.
    pub captcha_id: Option<String>,
    /// Captcha answer.
    pub captcha_word: Option<String>,
}

impl PublicationRequest {
    /// Normalizes names and checks that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Validation`] naming the first empty field among
    /// `user`, `title`, `sourcetitle` and `target`.
    pub fn normalize(&self) -> Result<NormalizedRequest, PublishError> {
        let normalized = NormalizedRequest {
            user: format_user(&self.user),
            title: format_title(&self.title),
            source_title: self.sourcetitle.clone(),
            lang: self.target.trim().to_string(),
            campaign: self.campaign.clone(),
            text: self.text.clone(),
            revid_hint: self.revid.clone().or_else(|| self.revision.clone()).unwrap_or_default(),
            captcha_id: self.captcha_id.clone(),
            captcha_word: self.captcha_word.clone(),
        };

        for (field, value) in [
            ("user", &normalized.user),
            ("title", &normalized.title),
            ("sourcetitle", &normalized.source_title),
            ("target", &normalized.lang),
        ] {
            if value.trim().is_empty() {
                return Err(PublishError::Validation { field: field.to_string() });
            }
        }
        Ok(normalized)
    }
}

/// Collapses known aliases, then turns underscores into spaces.
#[must_use]
pub fn format_user(raw: &str) -> String {
    let aliased = USER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map_or(raw, |(_, canonical)| canonical);
    aliased.replace('_', " ")
}

/// Turns underscores into spaces and folds the owner's alias subpages.
#[must_use]
pub fn format_title(raw: &str) -> String {
    raw.replace('_', " ").replace("Mr. Ibrahem 1/", "Mr. Ibrahem/")
}

/// The owner's own pages are published without the hashtag.
#[must_use]
pub fn determine_hashtag<'a>(title: &str, user: &str, configured: &'a str) -> &'a str {
    if title.contains(CANONICAL_OWNER) && user == CANONICAL_OWNER {
        ""
    } else {
        configured
    }
}

/// Edit summary pointing back at the source revision.
#[must_use]
pub fn make_summary(revid: &str, source_title: &str, lang: &str, hashtag: &str) -> String {
    format!(
        "Created by translating the page [[:mdwiki:Special:Redirect/revision/{revid}|{source_title}]] to:{lang} {hashtag}"
    )
}

/// Accepts a revision id sent either as a JSON number or as a string.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
