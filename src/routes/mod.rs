//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one evaluator session per connection)
/// - REST-ish session API under `/api/v1/...`
/// - Static evaluator frontend from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/subjects", get(http::http_get_subjects))
        .route("/api/v1/preferences", get(http::http_get_preferences))
        .route("/api/v1/sessions", post(http::http_create_session))
        .route(
            "/api/v1/sessions/:key",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/v1/sessions/:key/subject", post(http::http_post_subject))
        .route("/api/v1/sessions/:key/count", post(http::http_post_count))
        .route("/api/v1/sessions/:key/select", post(http::http_post_select))
        .route("/api/v1/sessions/:key/feedback", post(http::http_post_feedback))
        .route("/api/v1/sessions/:key/advance", post(http::http_post_advance))
        .route("/api/v1/sessions/:key/retry", post(http::http_post_retry))
        .route("/api/v1/sessions/:key/back", post(http::http_post_back))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::bank::LocalBank;
    use crate::config::ArenaConfig;

    fn app(pool: u64) -> Router {
        let cfg = ArenaConfig { local_pool_size: pool, ..ArenaConfig::default() };
        let backend = Arc::new(LocalBank::new(cfg.subjects.clone(), cfg.local_pool_size));
        build_router(Arc::new(AppState::with_backend(&cfg, backend)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn subjects_endpoint_lists_catalog() {
        let app = app(10);
        let (status, body) = call(&app, "GET", "/api/v1/subjects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subjects"].as_array().unwrap().len(), 14);
        assert_eq!(body["questionCounts"], json!([5, 10]));
    }

    #[tokio::test]
    async fn evaluator_walks_a_session_over_http() {
        let app = app(10);
        let (status, created) = call(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["session"]["state"], "subject_selection");
        let key = created["sessionKey"].as_str().unwrap().to_string();
        let base = format!("/api/v1/sessions/{key}");

        let (_, v) = call(&app, "POST", &format!("{base}/subject"), Some(json!({"subject": "알고리즘설계"}))).await;
        assert_eq!(v["session"]["state"], "count_selection");

        let (_, v) = call(&app, "POST", &format!("{base}/count"), Some(json!({"count": 5}))).await;
        assert_eq!(v["session"]["state"], "comparing");
        assert_eq!(v["session"]["completed"], 1);
        assert!(v["session"]["questionA"]["question"].as_str().unwrap().contains("알고리즘설계"));

        let (_, v) = call(&app, "POST", &format!("{base}/select"), Some(json!({"side": "A"}))).await;
        assert_eq!(v["session"]["state"], "resolved");
        assert_eq!(v["session"]["chosen"], "A");

        let (_, v) = call(&app, "POST", &format!("{base}/feedback"), Some(json!({"feedback": "보기가 명확함"}))).await;
        assert_eq!(v["session"]["notice"], "Feedback submitted.");

        let (_, v) = call(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(v["session"]["completed"], 2);

        let (_, prefs) = call(&app, "GET", "/api/v1/preferences", None).await;
        assert_eq!(prefs["selections"].as_array().unwrap().len(), 1);
        assert_eq!(prefs["selections"][0]["subject"], "알고리즘설계");
        assert_eq!(prefs["feedback"][0]["feedback"], "보기가 명확함");
    }

    #[tokio::test]
    async fn exhausted_pool_is_reported_as_state() {
        let app = app(1);
        let (_, created) = call(&app, "POST", "/api/v1/sessions", None).await;
        let key = created["sessionKey"].as_str().unwrap().to_string();
        let base = format!("/api/v1/sessions/{key}");

        call(&app, "POST", &format!("{base}/subject"), Some(json!({"subject": "확률변수"}))).await;
        call(&app, "POST", &format!("{base}/count"), Some(json!({"count": 5}))).await;
        call(&app, "POST", &format!("{base}/select"), Some(json!({"side": "B"}))).await;
        let (status, v) = call(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["session"]["state"], "exhausted");
        assert_eq!(v["session"]["subject"], Value::Null);
        assert_eq!(v["session"]["lastError"], Value::Null);

        let (_, v) = call(&app, "POST", &format!("{base}/back"), None).await;
        assert_eq!(v["session"]["state"], "subject_selection");
    }

    #[tokio::test]
    async fn rejections_carry_status_codes() {
        let app = app(10);
        let (status, _) = call(&app, "GET", &format!("/api/v1/sessions/{}", uuid::Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, created) = call(&app, "POST", "/api/v1/sessions", None).await;
        let key = created["sessionKey"].as_str().unwrap().to_string();
        let base = format!("/api/v1/sessions/{key}");

        let (status, body) = call(&app, "POST", &format!("{base}/select"), Some(json!({"side": "A"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("subject_selection"));

        let (status, _) = call(&app, "POST", &format!("{base}/subject"), Some(json!({"subject": "요리"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
