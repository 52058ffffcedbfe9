//! Upload session handlers.
//!
//! Each handler takes a generation ticket under the session lock, releases the
//! lock for the upstream call, then applies the result with the same ticket. The
//! upstream call runs in its own task so a cancelled request cannot strand a session.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use crate::llm::generate_plan_or_sentinel;
use crate::ocr::{TranscriptImage, recognize_or_placeholder};
use crate::session::{SessionError, SessionSnapshot, Transition, UploadEvent};
use crate::state::AppState;
use crate::transcript::CourseRecord;
use crate::web::error::ApiError;
use crate::web::transcript::read_transcript_image;

#[derive(Serialize, TS)]
#[ts(export)]
pub struct CreatedSession {
    pub id: String,
}

/// `POST /api/sessions`
pub(super) async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreatedSession>) {
    let id = state.sessions.create();
    debug!(session = %id, "session created");
    (StatusCode::CREATED, Json(CreatedSession { id }))
}

/// `GET /api/sessions/{id}`
pub(super) async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.snapshot(&id)?))
}

/// `POST /api/sessions/{id}/transcript` (multipart, `file` field)
pub(super) async fn upload_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let image = read_transcript_image(multipart?).await?;
    let generation = state
        .sessions
        .with_session(&id, |s| s.select_file(image.file_name.clone()))??;

    // Spawned so the session still resolves if this request is dropped.
    tokio::spawn(resolve_upload(state.clone(), id.clone(), generation, image))
        .await
        .map_err(|e| ApiError::internal("transcript recognition", e))??;

    Ok(Json(state.sessions.snapshot(&id)?))
}

async fn resolve_upload(
    state: AppState,
    id: String,
    generation: u64,
    image: TranscriptImage,
) -> Result<(), SessionError> {
    let event = match recognize_or_placeholder(state.recognizer.as_ref(), &image).await {
        Ok(text) => UploadEvent::OcrResolved { text },
        Err(placeholder) => UploadEvent::OcrFailed { placeholder },
    };

    let outcome = state
        .sessions
        .with_session(&id, |s| s.apply(generation, event))??;
    if outcome == Transition::Stale {
        info!(session = %id, generation, "discarded OCR result from superseded upload");
    }
    Ok(())
}

/// `POST /api/sessions/{id}/plan`
pub(super) async fn generate_session_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let (generation, courses) = state.sessions.with_session(&id, |s| {
        s.request_plan().map(|g| (g, s.courses().to_vec()))
    })??;

    tokio::spawn(resolve_plan(state.clone(), id.clone(), generation, courses))
        .await
        .map_err(|e| ApiError::internal("plan generation", e))??;

    Ok(Json(state.sessions.snapshot(&id)?))
}

async fn resolve_plan(
    state: AppState,
    id: String,
    generation: u64,
    courses: Vec<CourseRecord>,
) -> Result<(), SessionError> {
    let event = match generate_plan_or_sentinel(state.planner.as_ref(), &courses).await {
        Ok(plan) => UploadEvent::PlanResolved { plan },
        Err(placeholder) => UploadEvent::PlanFailed { placeholder },
    };

    let outcome = state
        .sessions
        .with_session(&id, |s| s.apply(generation, event))??;
    if outcome == Transition::Stale {
        info!(session = %id, generation, "discarded plan for superseded upload");
    }
    Ok(())
}
