//! Splits free-form LLM study plans into per-day task lists.
//!
//! Model output is unconstrained, so this is best effort: missing day markers,
//! odd casing and empty blocks all produce a usable (possibly empty) result.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use ts_rs::TS;

use crate::transcript::impact::{resource_for_section, section_for_topic};

/// Leading `Day 3:` or `3.` header marker.
static DAY_MARKER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)^(day\s+[0-9]+\s*:\s*|[0-9]+\.\s*)").expect("day marker pattern is valid")
});

const DEFAULT_TOPIC: &str = "Study Plan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Task {
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub khan_academy_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudyDay {
    pub date: String,
    pub tasks: Vec<Task>,
}

/// Resource link for a task line, keyed on the text before its first colon.
fn task_link(task: &str) -> Option<String> {
    let head = task.split(':').next().unwrap_or_default();
    head.split(',')
        .find_map(section_for_topic)
        .and_then(resource_for_section)
        .map(|r| r.playlist_url.to_owned())
}

/// Strip a leading day marker, falling back to the default topic.
fn header_topic(header: &str) -> String {
    let topic = DAY_MARKER_RE.replace(header.trim(), "");
    let topic = topic.trim();
    if topic.is_empty() {
        DEFAULT_TOPIC.to_owned()
    } else {
        topic.to_owned()
    }
}

/// Segment plan text into study days. Pure; never fails.
pub fn segment_plan(plan: &str) -> Vec<StudyDay> {
    let normalized = plan.replace("\r\n", "\n");

    normalized
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .enumerate()
        .map(|(index, block)| {
            let mut lines = block.lines().map(str::trim).skip_while(|l| l.is_empty());
            let topic = header_topic(lines.next().unwrap_or_default());

            let tasks = lines
                .filter(|l| !l.is_empty())
                .map(|line| Task {
                    description: line.to_owned(),
                    completed: false,
                    khan_academy_link: task_link(line),
                })
                .collect();

            StudyDay {
                date: format!("Day {}: {topic}", index + 1),
                tasks,
            }
        })
        .collect()
}
