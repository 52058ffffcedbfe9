//! Router-level tests for the upload session flow.

mod helpers;

use axum::http::StatusCode;
use helpers::{
    FakePlanner, PanickingPlanner, SlowPlanner, StalledPlanner, app, empty_request, router, send,
    upload_request,
};
use satprep::llm::PLAN_FAILURE_TEXT;
use satprep::ocr::OCR_FAILURE_TEXT;
use satprep::web::RouterOptions;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

async fn create(app: &axum::Router) -> String {
    let (status, body) = send(app, empty_request("POST", "/api/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_full_session_flow() {
    let planner = Arc::new(FakePlanner::new(Some("Day 1: Algebra\nEquations: drills")));
    let app = router(Some("Algebra 2 - B+\nPhysics - A"), planner.clone());
    let id = create(&app).await;

    let (status, body) = send(&app, empty_request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["generation"], 0);

    let (status, body) = send(
        &app,
        upload_request(&format!("/api/sessions/{id}/transcript"), "t.png", b"img"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "recognized");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["fileName"], "t.png");
    assert_eq!(body["courses"].as_array().unwrap().len(), 2);
    assert_eq!(body["estimatedScores"]["math"], 550);

    let (status, body) = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "planReady");
    assert_eq!(body["plan"], "Day 1: Algebra\nEquations: drills");
    assert_eq!(planner.last_course_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_plan_failure_moves_to_failed_phase() {
    let app = router(Some("Geometry - C"), Arc::new(FakePlanner::new(None)));
    let id = create(&app).await;
    send(
        &app,
        upload_request(&format!("/api/sessions/{id}/transcript"), "t.png", b"img"),
    )
    .await;

    let (status, body) = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "planFailed");
    assert_eq!(body["plan"], PLAN_FAILURE_TEXT);
}

#[tokio::test]
async fn test_ocr_failure_blocks_plan_generation() {
    let planner = Arc::new(FakePlanner::new(Some("unused")));
    let app = router(None, planner.clone());
    let id = create(&app).await;

    let (status, body) = send(
        &app,
        upload_request(&format!("/api/sessions/{id}/transcript"), "t.png", b"img"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "recognized");
    assert_eq!(body["extractedText"], OCR_FAILURE_TEXT);
    assert!(body["courses"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_COURSES");
    assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_plan_before_upload_is_invalid() {
    let app = router(Some("x"), Arc::new(FakePlanner::new(Some("p"))));
    let id = create(&app).await;
    let (status, body) = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_reupload_starts_new_generation() {
    let app = router(Some("English 9 - A"), Arc::new(FakePlanner::new(Some("plan"))));
    let id = create(&app).await;
    let path = format!("/api/sessions/{id}/transcript");

    send(&app, upload_request(&path, "first.png", b"1")).await;
    send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    let (_, body) = send(&app, upload_request(&path, "second.png", b"2")).await;

    assert_eq!(body["generation"], 2);
    assert_eq!(body["fileName"], "second.png");
    assert_eq!(body["phase"], "recognized");
    assert!(body["plan"].is_null());
}

#[tokio::test]
async fn test_unknown_session() {
    let app = router(Some("x"), Arc::new(FakePlanner::new(None)));
    let (status, body) = send(&app, empty_request("GET", "/api/sessions/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");

    let (status, _) = send(
        &app,
        upload_request("/api/sessions/nope/transcript", "t.png", b"img"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_counts_sessions() {
    let app = router(None, Arc::new(FakePlanner::new(None)));
    create(&app).await;
    create(&app).await;
    let (status, body) = send(&app, empty_request("GET", "/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeSessions"], 2);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

async fn upload_session(app: &axum::Router) -> String {
    let id = create(app).await;
    let (status, body) = send(
        app,
        upload_request(&format!("/api/sessions/{id}/transcript"), "t.png", b"img"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "recognized");
    id
}

#[tokio::test]
async fn test_dropped_plan_request_still_resolves_session() {
    let planner = Arc::new(SlowPlanner {
        delay: Duration::from_millis(150),
        plan: "Day 1: Geometry".into(),
    });
    let (app, _state) = app(Some("Geometry - B"), planner, RouterOptions::default());
    let id = upload_session(&app).await;

    let plan_request = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan")));
    assert!(
        tokio::time::timeout(Duration::from_millis(30), plan_request)
            .await
            .is_err()
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    let (_, body) = send(&app, empty_request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(body["phase"], "planReady");
    assert_eq!(body["plan"], "Day 1: Geometry");
}

#[tokio::test]
async fn test_stalled_plan_is_failed_by_sweep() {
    let (app, state) = app(
        Some("Algebra 1 - A"),
        Arc::new(StalledPlanner),
        RouterOptions::default(),
    );
    let id = upload_session(&app).await;
    let plan_path = format!("/api/sessions/{id}/plan");

    let plan_request = send(&app, empty_request("POST", &plan_path));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), plan_request)
            .await
            .is_err()
    );

    let (status, body) = send(&app, empty_request("POST", &plan_path)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert_eq!(state.sessions.evict_idle(Duration::ZERO), 0);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(state.sessions.fail_stalled(Duration::ZERO), 1);
    let (_, body) = send(&app, empty_request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(body["phase"], "planFailed");
    assert_eq!(body["plan"], PLAN_FAILURE_TEXT);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(state.sessions.evict_idle(Duration::ZERO), 1);
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_planner_panic_is_internal_error() {
    let (app, _state) = app(
        Some("Physics - A"),
        Arc::new(PanickingPlanner),
        RouterOptions::default(),
    );
    let id = upload_session(&app).await;

    let (status, body) = send(&app, empty_request("POST", &format!("/api/sessions/{id}/plan"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL");
    assert_eq!(body["message"], "plan generation failed");
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let planner = Arc::new(SlowPlanner {
        delay: Duration::from_millis(500),
        plan: "late".into(),
    });
    let options = RouterOptions {
        request_timeout: Duration::from_millis(50),
        cors_origin: None,
    };
    let (app, _state) = app(None, planner, options);

    let request = helpers::json_request(
        "POST",
        "/api/generate-plan",
        &serde_json::json!({"coursesAndGrades": []}),
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}
