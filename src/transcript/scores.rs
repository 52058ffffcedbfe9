//! Baseline SAT score estimation from course names.
//!
//! This is a fixed, auditable proxy model: identical input always yields identical
//! scores. Each course contributes at most one rule per subject, plus the
//! independent physics bonus on the math side.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use ts_rs::TS;

use super::parser::CourseRecord;

pub const MATH_BASELINE: i32 = 500;
pub const ENGLISH_BASELINE: i32 = 510;

pub const SCORE_MIN: i32 = 400;
pub const SCORE_MAX: i32 = 800;

static CALCULUS_WORD_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\bcalculus\b").expect("calculus pattern is valid"));

/// Estimated section scores, each within `[SCORE_MIN, SCORE_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EstimatedScores {
    pub math: i32,
    pub english: i32,
}

/// Math points from the first matching course-level rule.
fn math_points(course: &str) -> i32 {
    if course.contains("pre-calculus") || course.contains("precalculus") {
        50
    } else if CALCULUS_WORD_RE.is_match(course) {
        200
    } else if course.contains("algebra") {
        20
    } else {
        0
    }
}

/// Stacks with [`math_points`].
fn physics_points(course: &str) -> i32 {
    if course.contains("physics") { 30 } else { 0 }
}

/// English points from the first matching rule.
fn english_points(course: &str) -> i32 {
    if course.contains("ap lit") {
        90
    } else if course.contains("ap english") || course.contains("ap lang") {
        170
    } else if course.contains("journalism") || course.contains("writing") {
        30
    } else if course.contains("english") {
        10
    } else {
        0
    }
}

/// Estimate math and english scores for a list of taken courses.
pub fn estimate_sat_scores(courses: &[CourseRecord]) -> EstimatedScores {
    let (math, english) = courses.iter().fold(
        (MATH_BASELINE, ENGLISH_BASELINE),
        |(math, english), record| {
            let name = record.course.to_lowercase();
            (
                math.saturating_add(math_points(&name))
                    .saturating_add(physics_points(&name)),
                english.saturating_add(english_points(&name)),
            )
        },
    );

    EstimatedScores {
        math: math.clamp(SCORE_MIN, SCORE_MAX),
        english: english.clamp(SCORE_MIN, SCORE_MAX),
    }
}
