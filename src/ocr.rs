//! Client for the external OCR service.
//!
//! Recognition itself is a black box: an image goes in, line-oriented text comes
//! out. Callers that must keep the flow moving use [`recognize_or_placeholder`].

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::utils::{fmt_duration, log_if_slow, parse_json_with_context, truncate_for_log};

/// Shown in place of extracted text when recognition fails.
pub const OCR_FAILURE_TEXT: &str = "Failed to extract text from image.";

const SLOW_OCR_THRESHOLD: Duration = Duration::from_secs(10);

/// Upstream error bodies are cut to this many chars before they reach logs.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// An uploaded transcript image.
#[derive(Debug, Clone)]
pub struct TranscriptImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OCR service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse OCR response")]
    ParseFailed(#[source] anyhow::Error),
    #[error("Uploaded image is empty")]
    EmptyImage,
}

impl OcrError {
    fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_for_log(body, MAX_ERROR_BODY_CHARS),
        }
    }
}

/// Turns an image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &TranscriptImage) -> Result<String, OcrError>;
}

#[derive(Deserialize)]
struct OcrResponse {
    text: String,
}

/// OCR over HTTP: multipart `file` upload, `{ "text": ... }` response.
pub struct HttpOcrClient {
    http: reqwest::Client,
    url: String,
}

impl HttpOcrClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TextRecognizer for HttpOcrClient {
    #[instrument(skip(self, image), fields(file = %image.file_name, size = image.bytes.len()))]
    async fn recognize(&self, image: &TranscriptImage) -> Result<String, OcrError> {
        if image.bytes.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        let mut part =
            reqwest::multipart::Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
        if let Some(ct) = &image.content_type {
            part = part.mime_str(ct)?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let start = Instant::now();
        let resp = self.http.post(&self.url).multipart(form).send().await?;
        log_if_slow(start, SLOW_OCR_THRESHOLD, "OCR request");

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(OcrError::status(status.as_u16(), &body));
        }

        let parsed: OcrResponse = parse_json_with_context(&body).map_err(OcrError::ParseFailed)?;
        debug!(
            chars = parsed.text.len(),
            elapsed = fmt_duration(start.elapsed()),
            "OCR completed"
        );
        Ok(parsed.text)
    }
}

/// Run recognition, substituting [`OCR_FAILURE_TEXT`] on failure.
pub async fn recognize_or_placeholder(
    recognizer: &dyn TextRecognizer,
    image: &TranscriptImage,
) -> Result<String, String> {
    match recognizer.recognize(image).await {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(error = %e, file = %image.file_name, "OCR failed");
            Err(OCR_FAILURE_TEXT.to_owned())
        }
    }
}
