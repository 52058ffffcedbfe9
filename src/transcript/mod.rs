//! Transcript parsing and SAT estimation.

pub mod catalog;
pub mod impact;
pub mod parser;
pub mod scores;

use serde::Serialize;
use ts_rs::TS;

pub use catalog::{PotentialGain, Subject, find_untaken_high_impact};
pub use impact::{CourseImpact, calculate_course_impact};
pub use parser::{CourseRecord, Grade, parse_transcript};
pub use scores::{EstimatedScores, estimate_sat_scores};

/// Everything derived from one set of taken courses.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TranscriptAnalysis {
    pub courses: Vec<CourseRecord>,
    pub estimated_scores: EstimatedScores,
    pub potential_gains: Vec<PotentialGain>,
}

impl TranscriptAnalysis {
    pub fn from_courses(courses: Vec<CourseRecord>) -> Self {
        let estimated_scores = estimate_sat_scores(&courses);
        let potential_gains = find_untaken_high_impact(&courses);
        Self {
            courses,
            estimated_scores,
            potential_gains,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_courses(parse_transcript(text))
    }
}
