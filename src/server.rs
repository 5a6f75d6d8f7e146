//! HTTP endpoint accepting publish requests.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::publish::request::PublicationRequest;
use crate::publish::Publisher;

/// Routes: `POST /` publishes, any other method on `/` is a 405.
pub fn router(publisher: Arc<Publisher>) -> Router {
    Router::new()
        .route("/", post(publish).fallback(method_not_allowed))
        .with_state(publisher)
}

/// Binds `bind` and serves until the listener fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops with
/// an I/O error.
pub async fn serve(publisher: Arc<Publisher>, bind: &str) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| format!("Failed to bind {bind}: {e}"))?;
    tracing::info!(bind, "listening");
    axum::serve(listener, router(publisher)).await.map_err(|e| format!("Server error: {e}"))
}

async fn publish(
    State(publisher): State<Arc<Publisher>>,
    Form(request): Form<PublicationRequest>,
) -> Response {
    // Ports block on I/O, so the pipeline runs off the async workers.
    match tokio::task::spawn_blocking(move || publisher.publish(&request)).await {
        Ok(outcome) => Json(outcome.body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "publish task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"})))
                .into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({"error": "Only POST requests are allowed"})))
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::ports::Generation;
    use crate::publish::fixtures::{seed_credentials, test_settings, Harness};

    fn app(harness: &mut Harness) -> Router {
        router(Arc::new(Publisher::new(harness.take_ctx(), test_settings())))
    }

    fn form(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn non_post_is_rejected_with_405() {
        let mut h = Harness::new(vec![], vec![]);
        let request = Request::builder().method("GET").uri("/").body(Body::empty()).unwrap();

        let response = app(&mut h).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await, json!({"error": "Only POST requests are allowed"}));
    }

    #[tokio::test]
    async fn unknown_principal_gets_noaccess_body() {
        let mut h = Harness::new(vec![], vec![]);

        let response = app(&mut h)
            .oneshot(form("user=Nobody&title=Foo&sourcetitle=Foo&target=fr&text=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], json!("noaccess"));
        assert_eq!(body["username"], json!("Nobody"));
        assert!(h.edits.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_field_is_reported_in_body() {
        let mut h = Harness::new(vec![], vec![]);

        let response =
            app(&mut h).oneshot(form("user=Alice&title=Foo&target=fr")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], json!("invalid"));
    }

    #[tokio::test]
    async fn successful_publish_returns_edit_payload() {
        let mut h = Harness::new(
            vec![Ok(json!({"edit": {"result": "Success"}}))],
            vec![Ok(json!({"success": 1}))],
        );
        seed_credentials(&h.store, "Jane Doe", Generation::Current);

        let response = app(&mut h)
            .oneshot(form("user=Jane_Doe&title=Foo&sourcetitle=Foo&target=fr&text=x&revid=12"))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["edit"]["result"], json!("Success"));
        assert_eq!(body["LinkToWikidata"]["result"], json!("success"));
        let (edit, principal) = &h.edits.calls()[0];
        assert_eq!(principal, "Jane Doe");
        assert!(edit.summary.contains("revision/12|Foo"));
    }
}
