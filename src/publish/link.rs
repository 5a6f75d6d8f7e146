//! Linking published pages to knowledge-base entities.
//!
//! A site-link that fails only because no CSRF token could be fetched for
//! the acting principal is retried once with the fallback principal's
//! credentials. The first error stays on the outcome either way and is
//! classified and audited here, independently of the edit's own record.

use serde_json::{json, Value};

use super::audit::AuditWriter;
use super::classify::LINK_SIGNATURES;
use super::credentials::CredentialResolver;
use crate::error::PublishError;
use crate::ports::{
    AuditRecord, Clock, CredentialPair, LinkService, PageStore, SiteLinkRequest, TOKEN_FAILURE,
};

/// Error recorded when no credentials exist for the linking principal.
pub const NO_CREDENTIALS: &str = "no credentials";

/// Whether the site-link was set.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkStatus {
    /// The knowledge base accepted the link.
    Linked,
    /// The link was not set; `error` is the service's error value.
    Failed {
        /// Error value, a string or the service's error object.
        error: Value,
        /// Full service payload.
        payload: Value,
    },
}

/// The single retry made with the fallback principal.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackAttempt {
    /// Principal whose credentials made the retry.
    pub fallback_user: String,
    /// Principal who made the first attempt.
    pub original_user: String,
    /// Outcome of the retry; `None` when the fallback principal has no
    /// credentials either.
    pub retry: Option<Box<LinkOutcome>>,
}

impl FallbackAttempt {
    /// Whether the retry set the link.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.retry.as_ref().is_some_and(|r| r.is_linked())
    }

    /// The retry's response shape. Only a successful retry names the
    /// principals; a retry that never ran is an empty object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let Some(retry) = &self.retry else {
            return json!({});
        };
        let mut body = retry.to_json();
        if retry.is_linked() {
            body["fallback_user"] = json!(self.fallback_user);
            body["original_user"] = json!(self.original_user);
        }
        body
    }
}

/// Result of one `link` call.
///
/// `status` is the first attempt's. A fallback retry never overwrites it;
/// the retry is carried in `fallback`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    /// Entity id from the reference table, empty if unknown.
    pub qid: String,
    /// Status of the first attempt.
    pub status: LinkStatus,
    /// Present when a fallback retry was made.
    pub fallback: Option<FallbackAttempt>,
}

impl LinkOutcome {
    fn linked(qid: &str) -> Self {
        Self { qid: qid.to_string(), status: LinkStatus::Linked, fallback: None }
    }

    fn failed(qid: &str, error: Value, payload: Value) -> Self {
        Self { qid: qid.to_string(), status: LinkStatus::Failed { error, payload }, fallback: None }
    }

    /// Whether the first attempt set the link.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.status == LinkStatus::Linked
    }

    /// The first attempt's error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Value> {
        match &self.status {
            LinkStatus::Linked => None,
            LinkStatus::Failed { error, .. } => Some(error),
        }
    }

    /// The first attempt's error as a classified [`PublishError`].
    #[must_use]
    pub fn failure(&self) -> Option<PublishError> {
        self.error().map(|e| PublishError::LinkFailure {
            category: LINK_SIGNATURES.classify_value(e).to_string(),
        })
    }

    /// Response shape: `{result, qid}` on success, otherwise the service
    /// payload with `error`, `qid` and any `fallback` retry.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match &self.status {
            LinkStatus::Linked => json!({"result": "success", "qid": self.qid}),
            LinkStatus::Failed { error, payload } => {
                let mut body = match payload {
                    Value::Object(map) => Value::Object(map.clone()),
                    _ => json!({}),
                };
                body["error"] = error.clone();
                body["qid"] = json!(self.qid);
                if let Some(fallback) = &self.fallback {
                    body["fallback"] = fallback.to_json();
                }
                body
            }
        }
    }
}

/// What to link.
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'r> {
    /// Source article title.
    pub source_title: &'r str,
    /// Target language code.
    pub lang: &'r str,
    /// Acting principal.
    pub principal: &'r str,
    /// Published page title.
    pub target_title: &'r str,
}

/// Sets site-links and audits failures.
pub struct Linker<'a> {
    pages: &'a dyn PageStore,
    links: &'a dyn LinkService,
    resolver: &'a CredentialResolver<'a>,
    audit: &'a AuditWriter<'a>,
    clock: &'a dyn Clock,
    fallback_user: &'a str,
}

impl<'a> Linker<'a> {
    /// Creates a linker.
    #[must_use]
    pub fn new(
        pages: &'a dyn PageStore,
        links: &'a dyn LinkService,
        resolver: &'a CredentialResolver<'a>,
        audit: &'a AuditWriter<'a>,
        clock: &'a dyn Clock,
        fallback_user: &'a str,
    ) -> Self {
        Self { pages, links, resolver, audit, clock, fallback_user }
    }

    /// Links `target_title` to the entity of `source_title`.
    ///
    /// `credentials` are resolved for the principal when not supplied.
    #[must_use]
    pub fn link(
        &self,
        request: LinkRequest<'_>,
        credentials: Option<&CredentialPair>,
    ) -> LinkOutcome {
        let qid = self.qid_for(request.source_title);

        let resolved;
        let credentials = match credentials {
            Some(c) => c,
            None => match self.resolver.resolve(request.principal) {
                Some(c) => {
                    resolved = c;
                    &resolved
                }
                None => {
                    let outcome = LinkOutcome::failed(&qid, json!(NO_CREDENTIALS), json!({}));
                    self.record_failure(&request, &outcome);
                    return outcome;
                }
            },
        };

        let mut outcome = self.attempt(&request, &qid, credentials);

        let token_failure = outcome.error() == Some(&json!(TOKEN_FAILURE));
        if token_failure && request.principal != self.fallback_user {
            outcome.fallback = Some(self.retry_with_fallback(&request, &qid));
        }

        if outcome.is_linked() {
            tracing::info!(qid = %outcome.qid, title = %request.target_title, "site-link set");
            return outcome;
        }
        if outcome.fallback.as_ref().is_some_and(FallbackAttempt::succeeded) {
            tracing::info!(
                qid = %outcome.qid,
                title = %request.target_title,
                fallback = self.fallback_user,
                "site-link set with fallback principal"
            );
        }
        self.record_failure(&request, &outcome);
        outcome
    }

    fn qid_for(&self, source_title: &str) -> String {
        match self.pages.qid_for_title(source_title) {
            Ok(qid) => qid.unwrap_or_default(),
            Err(e) => {
                tracing::error!(source_title, error = %e, "qid lookup failed");
                String::new()
            }
        }
    }

    fn attempt(
        &self,
        request: &LinkRequest<'_>,
        qid: &str,
        credentials: &CredentialPair,
    ) -> LinkOutcome {
        let sitelink =
            SiteLinkRequest::new(qid, request.source_title, request.lang, request.target_title);
        match self.links.set_sitelink(&sitelink, credentials) {
            Ok(payload) if is_truthy(payload.get("success")) => LinkOutcome::linked(qid),
            Ok(payload) => {
                let error = payload.get("error").cloned().unwrap_or_else(|| payload.clone());
                tracing::warn!(
                    principal = %credentials.principal,
                    error = %error,
                    "site-link rejected"
                );
                LinkOutcome::failed(qid, error, payload)
            }
            Err(e) => {
                tracing::warn!(
                    principal = %credentials.principal,
                    error = %e,
                    "site-link transport failed"
                );
                LinkOutcome::failed(qid, json!(e.to_string()), json!({}))
            }
        }
    }

    fn retry_with_fallback(&self, request: &LinkRequest<'_>, qid: &str) -> FallbackAttempt {
        tracing::info!(
            principal = request.principal,
            fallback = self.fallback_user,
            "token failure, retrying site-link with fallback principal"
        );
        let retry = match self.resolver.resolve(self.fallback_user) {
            Some(credentials) => Some(Box::new(self.attempt(request, qid, &credentials))),
            None => {
                tracing::warn!(
                    fallback = self.fallback_user,
                    "fallback principal has no credentials"
                );
                None
            }
        };
        FallbackAttempt {
            fallback_user: self.fallback_user.to_string(),
            original_user: request.principal.to_string(),
            retry,
        }
    }

    fn record_failure(&self, request: &LinkRequest<'_>, outcome: &LinkOutcome) {
        let Some(error) = outcome.error() else {
            return;
        };
        let category = LINK_SIGNATURES.classify_value(error);
        let fallback =
            outcome.fallback.as_ref().map_or_else(|| json!(""), FallbackAttempt::to_json);
        let payload = json!({
            "error": error,
            "qid": outcome.qid,
            "title": request.target_title,
            "sourcetitle": request.source_title,
            "fallback": fallback,
            "lang": request.lang,
            "username": request.principal,
        });
        tracing::warn!(category, title = %request.target_title, "site-link failed");
        self.audit.write(&AuditRecord {
            timestamp: self.clock.now(),
            title: request.target_title.to_string(),
            user: request.principal.to_string(),
            lang: request.lang.to_string(),
            source_title: request.source_title.to_string(),
            category: category.to_string(),
            payload,
        });
    }
}

/// Loose truthiness of a JSON field: present, not null/false/0/"".
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
