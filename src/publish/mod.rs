//! The publish pipeline: one request from validation to audit.
//!
//! A request moves through credential resolution, edit submission and one of
//! three branches (success, captcha, rejection). The success branch links the
//! page and records the target. Every branch that passes validation ends in
//! exactly one audit record; a failed link on the success branch adds its own.

pub mod audit;
pub mod classify;
pub mod credentials;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod link;
pub mod request;
pub mod state;
pub mod target;

use serde_json::{json, Map, Value};

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::PublishError;
use crate::ports::{AuditRecord, CredentialPair, EditRequest};
use audit::AuditWriter;
use classify::EDIT_SIGNATURES;
use credentials::CredentialResolver;
use link::{is_truthy, LinkRequest, Linker};
use request::{determine_hashtag, make_summary, NormalizedRequest, PublicationRequest};
use state::ProcessState;
use target::{TargetUpsert, UpsertRequest};

/// Link outcome marker that routes the target into the user table.
const USER_TABLE_MARKER: &str = "abusefilter-warning-39";

/// How the wiki answered an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    /// `edit.result` was `Success`.
    Success,
    /// The wiki asked for a captcha.
    CaptchaRequired,
    /// Anything else.
    Failure,
}

/// An edit's status together with the payload it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// Interpreted status.
    pub status: EditStatus,
    /// Service payload, verbatim.
    pub payload: Value,
}

impl EditOutcome {
    /// Reads the status from `edit.result` and `edit.captcha`.
    #[must_use]
    pub fn from_payload(payload: Value) -> Self {
        let status = if payload["edit"]["result"] == json!("Success") {
            EditStatus::Success
        } else if is_truthy(payload["edit"].get("captcha")) {
            EditStatus::CaptchaRequired
        } else {
            EditStatus::Failure
        };
        Self { status, payload }
    }

    /// Payload used when the service could not be reached at all.
    #[must_use]
    pub fn transport_failure(message: &str) -> Self {
        Self::from_payload(json!({"error": {"code": "transport", "info": message}}))
    }

    /// The raw `edit.result` string, empty when absent.
    #[must_use]
    pub fn result(&self) -> &str {
        self.payload["edit"]["result"].as_str().unwrap_or_default()
    }
}

/// What one publish request produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    /// Audit category of the request (`success`, `captcha`, `noaccess`, an
    /// edit error category, or `invalid` when nothing was audited).
    pub category: String,
    /// JSON response body.
    pub body: Value,
    /// Error the request ended in, if any. On a successful edit this is the
    /// link's [`PublishError::LinkFailure`] when the first link attempt
    /// failed; `category` stays `success`.
    pub error: Option<PublishError>,
}

/// Runs publish requests against a service context.
pub struct Publisher {
    ctx: ServiceContext,
    settings: Settings,
    state: ProcessState,
}

impl Publisher {
    /// Creates a publisher with fresh process state. The audit report
    /// directory is fixed here, from the context's clock.
    #[must_use]
    pub fn new(ctx: ServiceContext, settings: Settings) -> Self {
        let state = ProcessState::start(&settings, ctx.clock.as_ref(), ctx.id_gen.as_ref());
        Self { ctx, settings, state }
    }

    /// Publishes one request. Never fails; every outcome is in the body.
    #[must_use]
    pub fn publish(&self, request: &PublicationRequest) -> PublishOutcome {
        let normalized = match request.normalize() {
            Ok(n) => n,
            Err(err) => {
                tracing::info!(error = %err, "rejected invalid request");
                return PublishOutcome {
                    category: err.code().to_string(),
                    body: json!({"error": {"code": err.code(), "info": err.to_string()}}),
                    error: Some(err),
                };
            }
        };

        let mut tab = Map::new();
        tab.insert("title".into(), json!(normalized.title));
        tab.insert("summary".into(), json!(""));
        tab.insert("lang".into(), json!(normalized.lang));
        tab.insert("user".into(), json!(normalized.user));
        tab.insert("campaign".into(), json!(normalized.campaign));
        tab.insert("result".into(), json!(""));
        tab.insert("edit".into(), json!([]));
        tab.insert("sourcetitle".into(), json!(normalized.source_title));

        let resolver = CredentialResolver::new(
            self.ctx.credentials.as_ref(),
            self.ctx.cipher.as_ref(),
            &self.state.principals,
        );
        let audit = AuditWriter::new(
            self.ctx.fs.as_ref(),
            self.ctx.reports.as_ref(),
            self.state.report_dir.path(),
        );

        let Some(credentials) = resolver.resolve(&normalized.user) else {
            return self.no_access(&normalized, tab, &audit);
        };

        let edit = self.submit(&normalized, &credentials, &mut tab);
        tab.insert("result".into(), json!(edit.result()));

        let (category, body, error) = match edit.status {
            EditStatus::Success => {
                let (body, link_error) = self.on_success(
                    &normalized,
                    &credentials,
                    &tab,
                    &resolver,
                    &audit,
                    edit.payload,
                );
                ("success".to_string(), body, link_error)
            }
            EditStatus::CaptchaRequired => {
                ("captcha".to_string(), edit.payload, Some(PublishError::CaptchaRequired))
            }
            EditStatus::Failure => {
                let category = EDIT_SIGNATURES.classify_value(&edit.payload).to_string();
                let error = PublishError::EditRejected { category: category.clone() };
                (category, edit.payload, Some(error))
            }
        };

        tracing::info!(
            category = %category,
            title = %normalized.title,
            user = %normalized.user,
            lang = %normalized.lang,
            "publish finished"
        );
        tab.insert("result_to_cx".into(), body.clone());
        self.record(&audit, &normalized, &category, tab);
        PublishOutcome { category, body, error }
    }

    fn no_access(
        &self,
        request: &NormalizedRequest,
        mut tab: Map<String, Value>,
        audit: &AuditWriter<'_>,
    ) -> PublishOutcome {
        let err = PublishError::CredentialNotFound { principal: request.user.clone() };
        tracing::info!(user = %request.user, "no credentials, edit not submitted");
        let error = json!({"code": "noaccess", "info": "noaccess"});
        let body = json!({
            "error": error,
            "edit": {"error": error, "username": request.user},
            "username": request.user,
        });
        tab.insert("result_to_cx".into(), body.clone());
        self.record(audit, request, err.code(), tab);
        PublishOutcome { category: err.code().to_string(), body, error: Some(err) }
    }

    /// Resolves the revision, builds the summary, normalizes the text and
    /// submits the edit.
    fn submit(
        &self,
        request: &NormalizedRequest,
        credentials: &CredentialPair,
        tab: &mut Map<String, Value>,
    ) -> EditOutcome {
        let revid = match self.ctx.revisions.revision_for(&request.source_title) {
            Ok(Some(revid)) if !revid.is_empty() => revid,
            Ok(_) => {
                tab.insert(
                    "empty revid".into(),
                    json!("Can not get revid from the revision directory"),
                );
                request.revid_hint.clone()
            }
            Err(e) => {
                tracing::warn!(
                    source_title = %request.source_title,
                    error = %e,
                    "revision lookup failed"
                );
                tab.insert("empty revid".into(), json!(format!("revision lookup failed: {e}")));
                request.revid_hint.clone()
            }
        };
        tab.insert("revid".into(), json!(revid));

        let hashtag = determine_hashtag(&request.title, &request.user, &self.settings.hashtag);
        let summary = make_summary(&revid, &request.source_title, &request.lang, hashtag);
        tab.insert("summary".into(), json!(summary));

        let mut text = request.text.clone();
        match self.ctx.normalizer.normalize(
            &request.source_title,
            &request.title,
            &text,
            &request.lang,
            &revid,
        ) {
            Ok(normalized) if !normalized.is_empty() => {
                let changed = normalized != text;
                tab.insert("fix_refs".into(), json!(if changed { "yes" } else { "no" }));
                text = normalized;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(title = %request.title, error = %e, "text normalization failed");
            }
        }

        let edit = EditRequest {
            lang: request.lang.clone(),
            title: request.title.clone(),
            summary,
            text,
            captcha_id: request.captcha_id.clone(),
            captcha_word: request.captcha_word.clone(),
        };
        let outcome = match self.ctx.edits.submit(&edit, credentials) {
            Ok(payload) => EditOutcome::from_payload(payload),
            Err(e) => {
                tracing::error!(title = %request.title, error = %e, "edit transport failed");
                EditOutcome::transport_failure(&e.to_string())
            }
        };
        tracing::debug!(title = %request.title, status = ?outcome.status, "edit submitted");
        outcome
    }

    fn on_success(
        &self,
        request: &NormalizedRequest,
        credentials: &CredentialPair,
        tab: &Map<String, Value>,
        resolver: &CredentialResolver<'_>,
        audit: &AuditWriter<'_>,
        mut payload: Value,
    ) -> (Value, Option<PublishError>) {
        let linker = Linker::new(
            self.ctx.pages.as_ref(),
            self.ctx.links.as_ref(),
            resolver,
            audit,
            self.ctx.clock.as_ref(),
            &self.settings.fallback_user,
        );
        let outcome = linker.link(
            LinkRequest {
                source_title: &request.source_title,
                lang: &request.lang,
                principal: &request.user,
                target_title: &request.title,
            },
            Some(credentials),
        );
        let link = outcome.to_json();

        let category = match self.ctx.pages.campaign_categories() {
            Ok(map) => map.get(&request.campaign).cloned().unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "campaign categories unavailable");
                String::new()
            }
        };
        let words =
            self.state.words.get_or_load(self.ctx.fs.as_ref(), &self.settings.words_snapshot);
        let upsert = TargetUpsert::new(self.ctx.pages.as_ref(), self.ctx.clock.as_ref(), words);
        let recorded = upsert.upsert(&UpsertRequest {
            title: request.source_title.clone(),
            translate_type: "lead".to_string(),
            category,
            lang: request.lang.clone(),
            user: request.user.clone(),
            test: false,
            target: request.title.clone(),
            force_user_table: link.to_string().contains(USER_TABLE_MARKER),
            revid: tab.get("revid").and_then(Value::as_str).unwrap_or_default().to_string(),
        });

        if !payload.is_object() {
            payload = json!({"edit": payload});
        }
        payload["LinkToWikidata"] = link;
        payload["sql_result"] = serde_json::to_value(&recorded).unwrap_or(Value::Null);
        (payload, outcome.failure())
    }

    fn record(
        &self,
        audit: &AuditWriter<'_>,
        request: &NormalizedRequest,
        category: &str,
        tab: Map<String, Value>,
    ) {
        audit.write(&AuditRecord {
            timestamp: self.ctx.clock.now(),
            title: request.title.clone(),
            user: request.user.clone(),
            lang: request.lang.clone(),
            source_title: request.source_title.clone(),
            category: category.to_string(),
            payload: Value::Object(tab),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use chrono::Duration;

    use crate::ports::{Generation, PageStore, ReportTable, TargetTable, TOKEN_FAILURE};
    use fixtures::{
        fixed_time, seed_credentials, test_settings, Harness, MarkingNormalizer, SharedClock,
        StaticRevisions,
    };

    fn success() -> Result<Value, String> {
        Ok(json!({"edit": {"result": "Success", "title": "Foo", "newrevid": 5}}))
    }

    fn linked() -> Result<Value, String> {
        Ok(json!({"success": 1}))
    }

    fn request(user: &str) -> PublicationRequest {
        PublicationRequest {
            user: user.into(),
            title: "Foo".into(),
            sourcetitle: "Foo".into(),
            target: "fr".into(),
            campaign: "Main".into(),
            text: "Article body".into(),
            revid: Some("77".into()),
            ..PublicationRequest::default()
        }
    }

    fn publisher(harness: &mut Harness) -> Publisher {
        Publisher::new(harness.take_ctx(), test_settings())
    }

    #[test]
    fn owner_alias_request_is_normalized_end_to_end() {
        let mut h = Harness::new(vec![success()], vec![linked()]);
        seed_credentials(&h.store, "Mr. Ibrahem", Generation::Current);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&PublicationRequest {
            user: "Admin".into(),
            title: "User:Mr._Ibrahem_1/Foo".into(),
            sourcetitle: "Foo".into(),
            target: "fr".into(),
            text: "...".into(),
            ..PublicationRequest::default()
        });

        assert_eq!(outcome.category, "success");
        assert!(outcome.error.is_none());
        let calls = h.edits.calls();
        assert_eq!(calls.len(), 1);
        let (edit, principal) = &calls[0];
        assert_eq!(principal, "Mr. Ibrahem");
        assert_eq!(edit.title, "User:Mr. Ibrahem/Foo");
        assert!(edit.summary.contains("to:fr"));
        assert!(!edit.summary.contains("#mdwikicx"));

        assert_eq!(
            h.store.count_targets(TargetTable::UserPages, "Foo", "fr", "Mr. Ibrahem").unwrap(),
            1
        );
        assert_eq!(outcome.body["LinkToWikidata"]["result"], json!("success"));
        assert_eq!(outcome.body["sql_result"]["routed_to_user_table"], json!(true));
    }

    #[test]
    fn missing_credentials_short_circuit_to_noaccess() {
        let mut h = Harness::new(vec![], vec![]);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Nobody"));

        assert_eq!(outcome.category, "noaccess");
        assert_eq!(
            outcome.error,
            Some(PublishError::CredentialNotFound { principal: "Nobody".into() })
        );
        assert!(h.edits.calls().is_empty());
        assert_eq!(outcome.body["edit"]["username"], json!("Nobody"));
        assert_eq!(outcome.body["error"]["code"], json!("noaccess"));

        let docs = h.audit_documents("noaccess");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["result_to_cx"], outcome.body);
        let rows = h.store.recent_reports(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result, "noaccess");
    }

    #[test]
    fn invalid_request_touches_nothing() {
        let mut h = Harness::new(vec![], vec![]);
        let publisher = publisher(&mut h);

        let outcome =
            publisher.publish(&PublicationRequest { title: String::new(), ..request("Alice") });

        assert_eq!(outcome.body["error"]["code"], json!("invalid"));
        assert_eq!(outcome.error, Some(PublishError::Validation { field: "title".into() }));
        assert!(h.fs.paths().is_empty());
        assert!(h.store.recent_reports(10).unwrap().is_empty());
    }

    #[test]
    fn captcha_challenge_is_terminal() {
        let captcha =
            json!({"edit": {"result": "Failure", "captcha": {"id": "42", "type": "image"}}});
        let mut h = Harness::new(vec![Ok(captcha.clone())], vec![]);
        seed_credentials(&h.store, "Alice", Generation::Legacy);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        assert_eq!(outcome.category, "captcha");
        assert_eq!(outcome.error, Some(PublishError::CaptchaRequired));
        assert_eq!(outcome.body, captcha);
        assert!(h.links.calls().is_empty());
        let docs = h.audit_documents("captcha");
        assert_eq!(docs[0]["result"], json!("Failure"));
    }

    #[test]
    fn rejected_edit_is_classified() {
        let rejection =
            json!({"error": {"code": "protectedpage", "info": "This page has been protected"}});
        let mut h = Harness::new(vec![Ok(rejection)], vec![]);
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        assert_eq!(outcome.category, "protectedpage");
        assert_eq!(
            outcome.error,
            Some(PublishError::EditRejected { category: "protectedpage".into() })
        );
        assert_eq!(h.audit_documents("protectedpage").len(), 1);
        assert!(h.links.calls().is_empty());
    }

    #[test]
    fn transport_failure_lands_in_default_category() {
        let mut h = Harness::new(vec![Err("connection reset".into())], vec![]);
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        assert_eq!(outcome.category, "errors");
        assert_eq!(outcome.body["error"]["code"], json!("transport"));
    }

    #[test]
    fn failed_link_writes_its_own_record_beside_success() {
        let refused = json!({"error": {
            "code": "failed-save",
            "info": "Links to user pages are not allowed"
        }});
        let mut h = Harness::new(vec![success()], vec![Ok(refused)]);
        seed_credentials(&h.store, "Alice", Generation::Current);
        h.store.insert_qid("Foo", "Q1").unwrap();
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        assert_eq!(outcome.category, "success");
        assert_eq!(
            outcome.error,
            Some(PublishError::LinkFailure { category: "wd_user_pages".into() })
        );
        assert_eq!(outcome.body["LinkToWikidata"]["qid"], json!("Q1"));

        let mut categories: Vec<String> =
            h.store.recent_reports(10).unwrap().into_iter().map(|r| r.result).collect();
        categories.sort();
        assert_eq!(categories, vec!["success".to_string(), "wd_user_pages".to_string()]);
        assert_eq!(h.audit_documents("wd_user_pages")[0]["username"], json!("Alice"));
        assert_eq!(h.audit_documents("success").len(), 1);
    }

    #[test]
    fn token_failure_on_success_path_uses_fallback() {
        let mut h = Harness::new(
            vec![success()],
            vec![Ok(json!({"error": TOKEN_FAILURE})), linked()],
        );
        seed_credentials(&h.store, "Alice", Generation::Current);
        seed_credentials(&h.store, "Mr. Ibrahem", Generation::Legacy);
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        let link = &outcome.body["LinkToWikidata"];
        assert_eq!(link["error"], json!(TOKEN_FAILURE));
        assert_eq!(link["fallback"]["result"], json!("success"));
        assert_eq!(link["fallback"]["fallback_user"], json!("Mr. Ibrahem"));
        assert_eq!(link["fallback"]["original_user"], json!("Alice"));
        assert_eq!(outcome.category, "success");

        let mut categories: Vec<String> =
            h.store.recent_reports(10).unwrap().into_iter().map(|r| r.result).collect();
        categories.sort();
        assert_eq!(categories, vec!["success".to_string(), "wd_csrftoken".to_string()]);
        assert_eq!(h.audit_documents("wd_csrftoken")[0]["username"], json!("Alice"));
    }

    #[test]
    fn report_directory_is_fixed_when_the_publisher_starts() {
        let mut h = Harness::new(vec![success()], vec![linked()]);
        let clock = SharedClock::at(fixed_time());
        h.ctx.clock = Box::new(clock.clone());
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        clock.set(fixed_time() + Duration::days(2));
        publisher.publish(&request("Alice"));

        let docs = h.audit_documents("success");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["time_date"], json!("2024-05-03 12:00:00"));
    }

    #[test]
    fn directory_revision_wins_over_client_hint() {
        let mut h = Harness::new(vec![success()], vec![linked()]);
        h.ctx.revisions =
            Box::new(StaticRevisions(HashMap::from([("Foo".to_string(), "123".to_string())])));
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        publisher.publish(&request("Alice"));

        let (edit, _) = &h.edits.calls()[0];
        assert!(edit.summary.contains("revision/123|Foo"));
        let doc = &h.audit_documents("success")[0];
        assert_eq!(doc["revid"], json!("123"));
        assert!(doc.get("empty revid").is_none());
    }

    #[test]
    fn client_revision_used_when_directory_is_empty() {
        let mut h = Harness::new(vec![success()], vec![linked()]);
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        publisher.publish(&request("Alice"));

        let (edit, _) = &h.edits.calls()[0];
        assert!(edit.summary.contains("revision/77|Foo"));
        assert!(edit.summary.ends_with("to:fr #mdwikicx"));
        let doc = &h.audit_documents("success")[0];
        assert!(doc.get("empty revid").is_some());
        let row =
            h.store.find_target(TargetTable::Pages, "Foo", "fr", "Alice").unwrap().unwrap();
        assert_eq!(row.revid, "77");
    }

    #[test]
    fn normalized_text_is_submitted_and_flagged() {
        let mut h = Harness::new(vec![success()], vec![linked()]);
        h.ctx.normalizer = Box::new(MarkingNormalizer);
        seed_credentials(&h.store, "Alice", Generation::Current);
        let publisher = publisher(&mut h);

        publisher.publish(&request("Alice"));

        let (edit, _) = &h.edits.calls()[0];
        assert!(edit.text.ends_with("<!-- refs fixed -->"));
        assert_eq!(h.audit_documents("success")[0]["fix_refs"], json!("yes"));
    }

    #[test]
    fn campaign_category_and_user_table_marker_reach_the_target() {
        let warning = json!({"error": {"code": "abusefilter-warning-39", "info": "warned"}});
        let mut h = Harness::new(vec![success()], vec![Ok(warning)]);
        seed_credentials(&h.store, "Alice", Generation::Current);
        h.store.insert_category("Main", "RTT").unwrap();
        let publisher = publisher(&mut h);

        let outcome = publisher.publish(&request("Alice"));

        assert_eq!(outcome.body["sql_result"]["forced"], json!(true));
        let row =
            h.store.find_target(TargetTable::UserPages, "Foo", "fr", "Alice").unwrap().unwrap();
        assert_eq!(row.category, "RTT");
        assert_eq!(row.translate_type, "lead");
        assert_eq!(row.target, "Foo");
    }

    #[test]
    fn edit_status_reads_nested_fields() {
        assert_eq!(
            EditOutcome::from_payload(json!({"edit": {"result": "Success"}})).status,
            EditStatus::Success
        );
        assert_eq!(
            EditOutcome::from_payload(json!({"edit": {"captcha": {"id": "1"}}})).status,
            EditStatus::CaptchaRequired
        );
        assert_eq!(EditOutcome::from_payload(json!({"error": "x"})).status, EditStatus::Failure);
        assert_eq!(EditOutcome::from_payload(json!({"error": "x"})).result(), "");
    }
}
