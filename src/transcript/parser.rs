//! Grade-line parsing for OCR'd transcript text.
//!
//! Each non-blank line is expected to look like `"<course> - <grade>"`. The grade
//! must sit at the very end of the line; anything else is kept whole as the course
//! name with a [`Grade::NotAvailable`] grade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use ts_rs::TS;

/// Trailing `- <grade>` suffix. Signed grades come first in the alternation so
/// `B+` is never read as `B`.
static GRADE_LINE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(.*)-\s*(A\+|A-|A|B\+|B-|B|C\+|C-|C|D\+|D-|D|F)$")
        .expect("grade line pattern is valid")
});

/// Letter grade as it appears on a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
    /// No grade token was found on the line.
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
            Self::NotAvailable => "N/A",
        }
    }

    /// Parse an exact grade token. `"N/A"` maps to [`Grade::NotAvailable`].
    pub fn parse(token: &str) -> Option<Self> {
        let grade = match token {
            "A+" => Self::APlus,
            "A" => Self::A,
            "A-" => Self::AMinus,
            "B+" => Self::BPlus,
            "B" => Self::B,
            "B-" => Self::BMinus,
            "C+" => Self::CPlus,
            "C" => Self::C,
            "C-" => Self::CMinus,
            "D+" => Self::DPlus,
            "D" => Self::D,
            "D-" => Self::DMinus,
            "F" => Self::F,
            "N/A" => Self::NotAvailable,
            _ => return None,
        };
        Some(grade)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CourseRecord {
    pub course: String,
    pub grade: Grade,
}

impl CourseRecord {
    pub fn new(course: impl Into<String>, grade: Grade) -> Self {
        Self {
            course: course.into(),
            grade,
        }
    }
}

/// Parse OCR text into course records, one per non-blank line, in input order.
pub fn parse_transcript(text: &str) -> Vec<CourseRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// Parse a single transcript line.
pub fn parse_line(line: &str) -> CourseRecord {
    let line = line.trim();

    if let Some(caps) = GRADE_LINE_RE.captures(line)
        && let Some(grade) = Grade::parse(&caps[2])
    {
        return CourseRecord::new(normalize_course_name(&caps[1]), grade);
    }

    CourseRecord::new(normalize_course_name(line), Grade::NotAvailable)
}

/// Trim and upper-case the leading character.
fn normalize_course_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
