//! Shared fixtures for router-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use satprep::llm::{LlmError, PlanGenerator};
use satprep::ocr::{OcrError, TextRecognizer, TranscriptImage};
use satprep::state::AppState;
use satprep::transcript::CourseRecord;
use satprep::web::{RouterOptions, create_router};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "satprep-test-boundary";

/// OCR fake returning fixed text, or failing when `text` is `None`.
pub struct FakeOcr {
    pub text: Option<String>,
}

#[async_trait]
impl TextRecognizer for FakeOcr {
    async fn recognize(&self, _image: &TranscriptImage) -> Result<String, OcrError> {
        self.text.clone().ok_or(OcrError::Status {
            status: 500,
            body: "ocr down".into(),
        })
    }
}

/// Plan fake that records how many courses it was asked about.
pub struct FakePlanner {
    pub plan: Option<String>,
    pub calls: AtomicUsize,
    pub last_course_count: AtomicUsize,
}

impl FakePlanner {
    pub fn new(plan: Option<&str>) -> Self {
        Self {
            plan: plan.map(str::to_owned),
            calls: AtomicUsize::new(0),
            last_course_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlanGenerator for FakePlanner {
    async fn generate_plan(&self, courses: &[CourseRecord]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_course_count.store(courses.len(), Ordering::SeqCst);
        self.plan.clone().ok_or(LlmError::EmptyCompletion)
    }
}

/// Resolves with `plan` only after `delay`.
pub struct SlowPlanner {
    pub delay: Duration,
    pub plan: String,
}

#[async_trait]
impl PlanGenerator for SlowPlanner {
    async fn generate_plan(&self, _courses: &[CourseRecord]) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.plan.clone())
    }
}

/// Never resolves.
pub struct StalledPlanner;

#[async_trait]
impl PlanGenerator for StalledPlanner {
    async fn generate_plan(&self, _courses: &[CourseRecord]) -> Result<String, LlmError> {
        std::future::pending().await
    }
}

pub struct PanickingPlanner;

#[async_trait]
impl PlanGenerator for PanickingPlanner {
    async fn generate_plan(&self, _courses: &[CourseRecord]) -> Result<String, LlmError> {
        panic!("planner blew up")
    }
}

pub fn router(ocr_text: Option<&str>, planner: Arc<FakePlanner>) -> Router {
    app(ocr_text, planner, RouterOptions::default()).0
}

/// Router plus a handle on its state, for tests that inspect sessions directly.
pub fn app(
    ocr_text: Option<&str>,
    planner: Arc<dyn PlanGenerator>,
    options: RouterOptions,
) -> (Router, AppState) {
    let state = AppState::new(
        Arc::new(FakeOcr {
            text: ocr_text.map(str::to_owned),
        }),
        planner,
    );
    (create_router(state.clone(), options), state)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// A multipart request carrying a single `file` field.
pub fn upload_request(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Send a request and decode the JSON response body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Extractor rejections are plain text; keep them inspectable.
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
