//! Review-page payloads.
//!
//! The upload page stores a `studyPlanData` blob in browser local storage; the
//! review page hands it back here to be turned into course impacts and study days.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use super::segment::{StudyDay, segment_plan};
use crate::transcript::impact::{CourseImpact, calculate_course_impact};

/// Current payload version. Blobs without a version predate versioning and are v1.
pub const STUDY_PLAN_DATA_VERSION: u32 = 1;

/// Shown when the day-by-day view is opened without a plan.
pub const NO_PLAN_MESSAGE: &str =
    "No study plan found. Please upload your transcript to generate one.";

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("study plan data version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("malformed study plan data: {0}")]
    Malformed(#[source] anyhow::Error),
}

fn default_version() -> u32 {
    STUDY_PLAN_DATA_VERSION
}

/// A stored course. Older clients wrote numeric grades, so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoredCourse {
    pub course: String,
    #[serde(deserialize_with = "grade_as_string")]
    pub grade: String,
}

fn grade_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGrade {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawGrade::deserialize(deserializer)? {
        RawGrade::Text(s) => s,
        RawGrade::Number(n) => n.to_string(),
    })
}

/// The `studyPlanData` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudyPlanData {
    #[serde(default = "default_version")]
    pub version: u32,
    pub courses_and_grades: Vec<StoredCourse>,
    pub plan: String,
}

impl StudyPlanData {
    /// Decode a stored blob, reporting the JSON path of any shape mismatch.
    pub fn from_json(raw: &str) -> Result<Self, ReviewError> {
        let data: Self = crate::utils::parse_json_with_context(raw).map_err(ReviewError::Malformed)?;
        data.check_version()?;
        Ok(data)
    }

    pub fn check_version(&self) -> Result<(), ReviewError> {
        if self.version > STUDY_PLAN_DATA_VERSION {
            return Err(ReviewError::UnsupportedVersion {
                found: self.version,
                supported: STUDY_PLAN_DATA_VERSION,
            });
        }
        Ok(())
    }
}

/// Everything the review page renders.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlanReview {
    pub course_impacts: Vec<CourseImpact>,
    pub study_days: Vec<StudyDay>,
}

impl PlanReview {
    pub fn build(data: &StudyPlanData) -> Self {
        let course_impacts = data
            .courses_and_grades
            .iter()
            .filter_map(|c| calculate_course_impact(&c.course, &c.grade))
            .collect();

        Self {
            course_impacts,
            study_days: segment_plan(&data.plan),
        }
    }
}

/// Extract and percent-decode the `plan` parameter from a raw query string.
///
/// Only percent-escapes are decoded; `+` is kept literally. Invalid UTF-8 after
/// decoding is replaced rather than rejected.
pub fn plan_from_query(raw_query: Option<&str>) -> Option<String> {
    let query = raw_query?;
    let value = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == "plan").then_some(value)
    })?;

    let decoded = urlencoding::decode_binary(value.as_bytes());
    let plan = String::from_utf8_lossy(&decoded).into_owned();
    (!plan.is_empty()).then_some(plan)
}
