//! Course impact on SAT sections, and the static SAT resource catalog.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Upper bound on a single course's potential score increase.
pub const MAX_POTENTIAL_INCREASE: f64 = 160.0;

/// A study resource for one SAT section.
#[derive(Debug, Clone, Copy)]
pub struct SatResource {
    pub section: &'static str,
    pub playlist_url: &'static str,
    /// Exact course names that feed into this section.
    pub related_courses: &'static [&'static str],
    /// Contribution weight applied to a course's impact tier.
    pub weight: f64,
    pub topics: &'static [&'static str],
    pub description: &'static str,
}

pub static SAT_RESOURCES: &[SatResource] = &[
    SatResource {
        section: "Reading & Writing",
        playlist_url: "https://www.youtube.com/watch?v=zpE-CfCvXiE&list=PL6dL3ACWCL8c_Vw8F0-97LPMr927tkAFV",
        related_courses: &["English", "Literature", "Writing"],
        weight: 0.8,
        topics: &["Reading Comprehension", "Writing Skills", "Grammar"],
        description: "Comprehensive playlist covering SAT Reading and Writing sections",
    },
    SatResource {
        section: "Heart of Algebra",
        playlist_url: "https://www.youtube.com/watch?v=fmt6mKBQhVg&list=PL6dL3ACWCL8ebFVL96B5PPrFv4gxckJu8",
        related_courses: &["Algebra 1", "Algebra 2"],
        weight: 0.7,
        topics: &["Linear Equations", "Systems of Equations", "Functions"],
        description: "Focused playlist for Heart of Algebra SAT section",
    },
    SatResource {
        section: "Passport to Advanced Math",
        playlist_url: "https://www.youtube.com/watch?v=zpE-CfCvXiE&list=PL6dL3ACWCL8c_Vw8F0-97LPMr927tkAFV",
        related_courses: &["Algebra 2", "Precalculus"],
        weight: 0.6,
        topics: &["Quadratic Equations", "Polynomials", "Rational Expressions"],
        description: "Advanced math topics for SAT",
    },
    SatResource {
        section: "Problem Solving & Data Analysis",
        playlist_url: "https://www.youtube.com/watch?v=zpE-CfCvXiE&list=PL6dL3ACWCL8c_Vw8F0-97LPMr927tkAFV",
        related_courses: &["Algebra 1", "Algebra 2", "Geometry", "Statistics"],
        weight: 0.5,
        topics: &["Data Analysis", "Statistics", "Probability"],
        description: "Data analysis and problem-solving skills",
    },
    SatResource {
        section: "Additional Topics in Math",
        playlist_url: "https://www.youtube.com/watch?v=q9_L7aTmbZw&list=PL6dL3ACWCL8cIVmBrzwD8JEy2i9jZUWgA",
        related_courses: &["Geometry", "Algebra 2", "Precalculus"],
        weight: 0.4,
        topics: &["Geometry", "Trigonometry", "Complex Numbers"],
        description: "Geometry, complex numbers, and trigonometry",
    },
];

/// Topic keyword → SAT section, in lookup priority order.
pub static TOPIC_SECTIONS: &[(&str, &str)] = &[
    ("Reading", "Reading & Writing"),
    ("Writing", "Reading & Writing"),
    ("Grammar", "Reading & Writing"),
    ("Algebra", "Heart of Algebra"),
    ("Equations", "Heart of Algebra"),
    ("Functions", "Heart of Algebra"),
    ("Data", "Problem Solving & Data Analysis"),
    ("Statistics", "Problem Solving & Data Analysis"),
    ("Probability", "Problem Solving & Data Analysis"),
    ("Geometry", "Additional Topics in Math"),
    ("Trigonometry", "Additional Topics in Math"),
    ("Complex Numbers", "Additional Topics in Math"),
];

/// How strongly a course relates to the SAT, and where to study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseImpact {
    pub course: String,
    pub impact: u32,
    pub potential_score_increase: f64,
    pub related_topics: Vec<String>,
    pub khan_academy_links: Vec<String>,
    pub sat_sections: Vec<String>,
}

/// Find a catalog entry by its section name.
pub fn resource_for_section(section: &str) -> Option<&'static SatResource> {
    SAT_RESOURCES.iter().find(|r| r.section == section)
}

/// Read the leading integer of a grade string (`" 87.5%"` → 87).
///
/// Returns `None` when no digits lead the string, which callers treat as the
/// lowest impact tier.
fn leading_integer(grade: &str) -> Option<i64> {
    let s = grade.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long digit runs; only the tier boundary matters.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Map a numeric grade to its impact tier.
pub fn impact_tier(grade: &str) -> u32 {
    match leading_integer(grade) {
        Some(v) if v >= 90 => 100,
        Some(v) if v >= 80 => 80,
        Some(v) if v >= 70 => 60,
        Some(v) if v >= 60 => 40,
        _ => 20,
    }
}

/// Estimate how a course feeds into SAT sections.
///
/// Returns `None` when the course relates to no section; callers should filter
/// these out rather than treat them as errors.
pub fn calculate_course_impact(course: &str, grade: &str) -> Option<CourseImpact> {
    let impact = impact_tier(grade);

    let mut potential = 0.0;
    let mut sat_sections = Vec::new();
    let mut related_topics = Vec::new();
    let mut khan_academy_links = Vec::new();

    for resource in SAT_RESOURCES
        .iter()
        .filter(|r| r.related_courses.iter().any(|c| *c == course))
    {
        potential += f64::from(impact) * resource.weight;
        sat_sections.push(resource.section.to_owned());
        khan_academy_links.push(resource.playlist_url.to_owned());
        related_topics.extend(resource.topics.iter().map(|t| (*t).to_owned()));
    }

    if sat_sections.is_empty() {
        return None;
    }

    Some(CourseImpact {
        course: course.to_owned(),
        impact,
        potential_score_increase: potential.min(MAX_POTENTIAL_INCREASE),
        related_topics,
        khan_academy_links,
        sat_sections,
    })
}

/// Section whose topic keyword appears in `text` (case-insensitive, table order).
pub fn section_for_topic(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    TOPIC_SECTIONS
        .iter()
        .find(|(keyword, _)| lowered.contains(&keyword.to_lowercase()))
        .map(|(_, section)| *section)
}

/// Playlist URLs for a set of topics, de-duplicated in first-seen order.
pub fn khan_academy_recommendations<S: AsRef<str>>(topics: &[S]) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for topic in topics {
        let Some(resource) = section_for_topic(topic.as_ref()).and_then(resource_for_section)
        else {
            continue;
        };
        if !links.iter().any(|l| l == resource.playlist_url) {
            links.push(resource.playlist_url.to_owned());
        }
    }
    links
}
