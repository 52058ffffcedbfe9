//! Transcript analysis handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use crate::ocr::{TranscriptImage, recognize_or_placeholder};
use crate::state::AppState;
use crate::transcript::TranscriptAnalysis;
use crate::web::error::ApiError;
use crate::web::extract::ApiJson;

#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub extracted_text: String,
    pub ocr_failed: bool,
    /// Absent when OCR failed.
    pub analysis: Option<TranscriptAnalysis>,
}

/// Pull the `file` field out of a multipart upload.
pub(super) async fn read_transcript_image(
    mut multipart: Multipart,
) -> Result<TranscriptImage, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("transcript").to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(ApiError::missing_file());
        }

        return Ok(TranscriptImage {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::missing_file())
}

/// `POST /api/transcript/analyze` with `{ "text": "..." }`
pub(super) async fn analyze(
    ApiJson(body): ApiJson<AnalyzeRequest>,
) -> Json<TranscriptAnalysis> {
    let analysis = TranscriptAnalysis::from_text(&body.text);
    debug!(courses = analysis.courses.len(), "analyzed transcript text");
    Json(analysis)
}

/// `POST /api/transcript/upload` (multipart, `file` field)
pub(super) async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let image = read_transcript_image(multipart?).await?;

    let response = match recognize_or_placeholder(state.recognizer.as_ref(), &image).await {
        Ok(text) => {
            let analysis = TranscriptAnalysis::from_text(&text);
            info!(
                file = %image.file_name,
                courses = analysis.courses.len(),
                "transcript recognized"
            );
            UploadResponse {
                extracted_text: text,
                ocr_failed: false,
                analysis: Some(analysis),
            }
        }
        Err(placeholder) => UploadResponse {
            extracted_text: placeholder,
            ocr_failed: true,
            analysis: None,
        },
    };

    Ok(Json(response))
}
