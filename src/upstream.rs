//! HTTP client for the question-generation / persistence service.
//!
//! Three JSON endpoints under the configured base URL:
//!   POST /compare_models/   {subject}  -> {"status":"ok", ...pair} | {"status":"exhausted"}
//!   POST /select_model/     {session_id, subject, question_index, selected_variant}
//!   POST /submit_feedback/  {session_id, feedback}
//!
//! Exhaustion is read only from the explicit `status` field. Any non-2xx
//! status, including 404, is a generic failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::backend::EvaluationBackend;
use crate::config::UpstreamSettings;
use crate::domain::{
    FeedbackSubmission, FetchedPair, QuestionIndex, QuestionPair, QuestionRecord, SelectionCommit,
    SessionId,
};
use crate::error::ServiceError;
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct GeneratorClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

#[derive(Serialize)]
struct ComparePairRequest<'a> {
    subject: &'a str,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ComparePairResponse {
    Ok {
        session_id: String,
        question_index: u64,
        variant_a: QuestionRecord,
        variant_b: QuestionRecord,
    },
    Exhausted,
}

/// Decode a compare-models body into a pair or the exhaustion signal.
fn parse_compare_response(body: &str, subject: &str) -> Result<FetchedPair, ServiceError> {
    let parsed: ComparePairResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Generic(format!("malformed pair response: {e}")))?;
    match parsed {
        ComparePairResponse::Ok { session_id, question_index, variant_a, variant_b } => Ok(FetchedPair {
            session_id: SessionId(session_id),
            pair: QuestionPair { question_index: QuestionIndex(question_index), variant_a, variant_b },
        }),
        ComparePairResponse::Exhausted => Err(ServiceError::Exhausted { subject: subject.to_string() }),
    }
}

/// Pull a human-readable message out of an error body, if there is one.
fn extract_error_detail(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("detail")
        .and_then(|d| d.as_str())
        .or_else(|| v.pointer("/error/message").and_then(|m| m.as_str()))
        .map(|s| s.to_string())
}

impl GeneratorClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, base_url: settings.base_url.clone() })
    }

    /// POST a JSON body and return the response text on 2xx.
    #[instrument(level = "debug", skip(self, body), fields(%path))]
    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, ServiceError> {
        let url = format!("{}/{}", self.base_url, path);
        let start = std::time::Instant::now();
        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "quiz-arena-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        let elapsed = start.elapsed();
        if !status.is_success() {
            let msg = extract_error_detail(&text).unwrap_or_else(|| trunc_for_log(&text, 200));
            error!(target: "upstream", %url, %status, ?elapsed, error = %msg, "Upstream call failed");
            return Err(ServiceError::Generic(format!("HTTP {status}: {msg}")));
        }
        info!(target: "upstream", %url, %status, ?elapsed, bytes = text.len(), "Upstream call ok");
        Ok(text)
    }
}

#[async_trait]
impl EvaluationBackend for GeneratorClient {
    fn name(&self) -> &'static str {
        "upstream"
    }

    #[instrument(level = "info", skip(self), fields(%subject))]
    async fn fetch_pair(&self, subject: &str) -> Result<FetchedPair, ServiceError> {
        let body = self.post_json("compare_models/", &ComparePairRequest { subject }).await?;
        parse_compare_response(&body, subject)
    }

    #[instrument(level = "info", skip(self, commit), fields(session_id = %commit.session_id, subject = %commit.subject))]
    async fn commit_selection(&self, commit: &SelectionCommit) -> Result<(), ServiceError> {
        self.post_json("select_model/", commit).await.map(|_| ())
    }

    #[instrument(level = "info", skip(self, feedback), fields(session_id = %feedback.session_id, feedback_len = feedback.feedback.len()))]
    async fn submit_feedback(&self, feedback: &FeedbackSubmission) -> Result<(), ServiceError> {
        self.post_json("submit_feedback/", feedback).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::domain::Variant;

    const PAIR_BODY: &str = r#"{
        "status": "ok",
        "session_id": "abc",
        "question_index": 12,
        "variant_a": {"question": "Q-a $x^2$", "choices": ["1", "2", "3", "4"], "answer": "2", "explanation": "e-a"},
        "variant_b": {"question": "Q-b", "choices": ["가", "나"], "answer": "1", "explanation": "e-b"}
    }"#;

    #[test]
    fn ok_response_becomes_pair() {
        let f = parse_compare_response(PAIR_BODY, "확률변수").unwrap();
        assert_eq!(f.session_id, SessionId("abc".into()));
        assert_eq!(f.pair.question_index, QuestionIndex(12));
        assert_eq!(f.pair.variant_a.question, "Q-a $x^2$");
        assert_eq!(f.pair.variant_b.choices, vec!["가", "나"]);
    }

    #[test]
    fn exhausted_status_is_distinguished() {
        assert_eq!(
            parse_compare_response(r#"{"status":"exhausted"}"#, "확률변수"),
            Err(ServiceError::Exhausted { subject: "확률변수".into() })
        );
    }

    #[test]
    fn garbage_is_generic() {
        assert!(matches!(parse_compare_response("<html>", "x"), Err(ServiceError::Generic(_))));
        assert!(matches!(parse_compare_response(r#"{"status":"weird"}"#, "x"), Err(ServiceError::Generic(_))));
    }

    #[test]
    fn error_detail_is_extracted() {
        assert_eq!(extract_error_detail(r#"{"detail":"no pair"}"#).as_deref(), Some("no pair"));
        assert_eq!(extract_error_detail(r#"{"error":{"message":"boom"}}"#).as_deref(), Some("boom"));
        assert_eq!(extract_error_detail("plain"), None);
    }

    /// Serves a fake upstream on an ephemeral port and returns its base URL.
    async fn fake_upstream(commits: Arc<Mutex<Vec<Value>>>) -> String {
        let app = Router::new()
            .route(
                "/compare_models/",
                post(|Json(body): Json<Value>| async move {
                    match body["subject"].as_str() {
                        Some("확률변수") => (StatusCode::OK, Json(json!({"status": "exhausted"}))),
                        Some("회로이론1") => (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"}))),
                        _ => (StatusCode::OK, Json(serde_json::from_str::<Value>(PAIR_BODY).unwrap())),
                    }
                }),
            )
            .route(
                "/select_model/",
                post(move |Json(body): Json<Value>| {
                    let commits = commits.clone();
                    async move {
                        commits.lock().unwrap().push(body);
                        Json(json!({"ok": true}))
                    }
                }),
            )
            .route(
                "/submit_feedback/",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> GeneratorClient {
        GeneratorClient::new(&UpstreamSettings { base_url, timeout_secs: 5 }).unwrap()
    }

    #[tokio::test]
    async fn talks_to_upstream_over_http() {
        let commits = Arc::new(Mutex::new(Vec::new()));
        let c = client(fake_upstream(commits.clone()).await);

        let f = c.fetch_pair("알고리즘설계").await.unwrap();
        assert_eq!(f.pair.question_index, QuestionIndex(12));

        assert_eq!(
            c.fetch_pair("확률변수").await,
            Err(ServiceError::Exhausted { subject: "확률변수".into() })
        );
        match c.fetch_pair("회로이론1").await {
            Err(ServiceError::Generic(msg)) => assert!(msg.contains("404") && msg.contains("not found"), "{msg}"),
            other => panic!("expected generic failure, got {other:?}"),
        }

        let commit = SelectionCommit {
            session_id: f.session_id.clone(),
            subject: "알고리즘설계".into(),
            question_index: f.pair.question_index,
            true_variant: Variant::VariantA,
        };
        c.commit_selection(&commit).await.unwrap();
        let sent = commits.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["selected_variant"], "variant_a");
        assert_eq!(sent[0]["question_index"], 12);

        let fb = FeedbackSubmission { session_id: f.session_id, feedback: "hi".into() };
        assert!(matches!(c.submit_feedback(&fb).await, Err(ServiceError::Generic(_))));
    }
}
