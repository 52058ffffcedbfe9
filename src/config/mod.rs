//! Application configuration, loaded from the environment (and an optional
//! `satprep.toml`) via figment.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level for the `satprep` target; `RUST_LOG` overrides it entirely.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// External OCR service accepting a multipart `file` upload.
    #[serde(default = "default_ocr_url")]
    pub ocr_url: String,

    /// Chat-completions API key. Without it, plan generation always fails softly.
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,
    #[serde(default = "default_llm_referer")]
    pub llm_referer: String,
    #[serde(default = "default_llm_title")]
    pub llm_title: String,

    /// Per-request timeout for OCR and LLM calls.
    #[serde(
        default = "default_upstream_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub upstream_timeout: Duration,
    /// Idle lifetime of an upload session.
    #[serde(default = "default_session_ttl", deserialize_with = "deserialize_duration")]
    pub session_ttl: Duration,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// Allowed browser origin for the frontend; any origin when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

impl Config {
    /// Load from `satprep.toml` (if present) overlaid with environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("satprep.toml"))
            .merge(Env::raw())
            .extract()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ocr_url() -> String {
    "http://localhost:3001/upload".to_string()
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "mistralai/mixtral-8x7b-instruct".to_string()
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_llm_referer() -> String {
    "https://sat-class.vercel.app/upload".to_string()
}

fn default_llm_title() -> String {
    "SAT Plan Generator".to_string()
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Parse `"30s"`, `"2m"`, `"1500ms"`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(s.trim())
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{s}': {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
