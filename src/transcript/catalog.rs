//! High-impact course catalog and the untaken-course finder.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::parser::CourseRecord;

/// SAT subject a potential gain applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Subject {
    Math,
    English,
}

/// A course known to move SAT scores, matched by keyword.
#[derive(Debug, Clone, Copy)]
pub struct HighImpactCourseRule {
    /// Lower-case substrings; any one present in a taken course name counts.
    pub match_keywords: &'static [&'static str],
    pub display_name: &'static str,
    pub math_points: Option<i32>,
    pub english_points: Option<i32>,
}

impl HighImpactCourseRule {
    /// Whether any taken course contains one of this rule's keywords.
    pub fn is_taken(&self, taken: &[CourseRecord]) -> bool {
        taken.iter().any(|record| {
            let name = record.course.to_lowercase();
            self.match_keywords.iter().any(|kw| name.contains(kw))
        })
    }

    fn gains(&self) -> impl Iterator<Item = PotentialGain> + '_ {
        [
            (Subject::Math, self.math_points),
            (Subject::English, self.english_points),
        ]
        .into_iter()
        .filter_map(move |(subject, points)| {
            points.map(|points| PotentialGain {
                course_name: self.display_name.to_owned(),
                subject,
                points,
            })
        })
    }
}

/// Point values mirror the score estimator's rules.
pub static HIGH_IMPACT_COURSES: &[HighImpactCourseRule] = &[
    HighImpactCourseRule {
        match_keywords: &["calculus"],
        display_name: "Calculus",
        math_points: Some(200),
        english_points: None,
    },
    HighImpactCourseRule {
        match_keywords: &["pre-calculus", "precalculus"],
        display_name: "Pre-Calculus",
        math_points: Some(50),
        english_points: None,
    },
    HighImpactCourseRule {
        match_keywords: &["algebra"],
        display_name: "Algebra",
        math_points: Some(20),
        english_points: None,
    },
    HighImpactCourseRule {
        match_keywords: &["physics"],
        display_name: "Physics",
        math_points: Some(30),
        english_points: None,
    },
    HighImpactCourseRule {
        match_keywords: &["ap english", "ap lang"],
        display_name: "AP English Language",
        math_points: None,
        english_points: Some(170),
    },
    HighImpactCourseRule {
        match_keywords: &["ap lit"],
        display_name: "AP Literature",
        math_points: None,
        english_points: Some(90),
    },
    HighImpactCourseRule {
        match_keywords: &["journalism", "writing"],
        display_name: "Journalism / Writing",
        math_points: None,
        english_points: Some(30),
    },
];

/// Score available from a course the student has not taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PotentialGain {
    pub course_name: String,
    pub subject: Subject,
    pub points: i32,
}

/// Gains for every catalog course absent from `taken`, in catalog order.
pub fn find_untaken_high_impact(taken: &[CourseRecord]) -> Vec<PotentialGain> {
    HIGH_IMPACT_COURSES
        .iter()
        .filter(|rule| !rule.is_taken(taken))
        .flat_map(HighImpactCourseRule::gains)
        .collect()
}
