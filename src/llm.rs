//! Study plan generation through an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::transcript::CourseRecord;
use crate::utils::{fmt_duration, log_if_slow, parse_json_with_context, truncate_for_log};

/// Returned to callers in place of a plan when generation fails.
pub const PLAN_FAILURE_TEXT: &str = "Failed to generate study plan.";

const SLOW_COMPLETION_THRESHOLD: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse completion response")]
    ParseFailed(#[source] anyhow::Error),
    #[error("completion response had no content")]
    EmptyCompletion,
}

/// Produces a study plan for a set of courses.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(&self, courses: &[CourseRecord]) -> Result<String, LlmError>;
}

/// Build the advisor prompt for a student's courses.
pub fn build_prompt(courses: &[CourseRecord]) -> String {
    let courses_text = courses
        .iter()
        .map(|c| format!("{} - {}", c.course, c.grade))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an SAT study advisor.

Here are the student's courses and grades:

{courses_text}

Please do the following (and keep it concise to be within token limits). Make it so that it sounds like
you're talking to the student:
1. Determine what SAT Math topics they should review based on the courses they have and haven't taken.
2. Determine what SAT English topics they should review based on the courses they have and haven't taken.
3. Provide a 7-day personalized study plan for Math and English based on this.

Return it in organized, readable text.
"
    )
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the plan text out of a completion body: `message.content`, else `text`.
fn extract_content(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = parse_json_with_context(body).map_err(LlmError::ParseFailed)?;
    let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyCompletion)?;
    choice
        .message
        .and_then(|m| m.content)
        .or(choice.text)
        .ok_or(LlmError::EmptyCompletion)
}

/// Chat-completions client (OpenRouter by default).
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    referer: String,
    title: String,
}

impl ChatCompletionClient {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(config.upstream_timeout)
                .build()?,
            endpoint: format!(
                "{}/chat/completions",
                config.llm_base_url.trim_end_matches('/')
            ),
            api_key: config.openrouter_api_key.clone().filter(|k| !k.is_empty()),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            referer: config.llm_referer.clone(),
            title: config.llm_title.clone(),
        })
    }
}

#[async_trait]
impl PlanGenerator for ChatCompletionClient {
    #[instrument(skip_all, fields(model = %self.model, courses = courses.len()))]
    async fn generate_plan(&self, courses: &[CourseRecord]) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let prompt = build_prompt(courses);

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
        };

        let start = Instant::now();
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&request)
            .send()
            .await?;
        log_if_slow(start, SLOW_COMPLETION_THRESHOLD, "plan completion");

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 500),
            });
        }

        let plan = extract_content(&body)?;
        debug!(
            chars = plan.len(),
            elapsed = fmt_duration(start.elapsed()),
            "plan generated"
        );
        Ok(plan)
    }
}

/// Generate a plan, falling back to [`PLAN_FAILURE_TEXT`] on any failure.
///
/// `Err` carries the fallback text so callers can still tell failure apart from
/// a successful but empty plan.
pub async fn generate_plan_or_sentinel(
    generator: &dyn PlanGenerator,
    courses: &[CourseRecord],
) -> Result<String, String> {
    match generator.generate_plan(courses).await {
        Ok(plan) => Ok(plan),
        Err(e) => {
            warn!(error = %e, "plan generation failed");
            Err(PLAN_FAILURE_TEXT.to_owned())
        }
    }
}
