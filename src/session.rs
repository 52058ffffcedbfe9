//! Upload session state machine.
//!
//! One session tracks a single student's upload flow:
//!
//! ```text
//! Idle --file--> Recognizing --ocr ok/failed--> Recognized --plan--> GeneratingPlan
//!                                                   ^                   |
//!                                                   |        ok/failed  v
//!                                                   +---- PlanReady / PlanFailed
//! ```
//!
//! Selecting a new file from any state restarts the flow and bumps the session's
//! generation. Results carry the generation they were started under; results from
//! an older generation are dropped.

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ts_rs::TS;

use crate::llm::PLAN_FAILURE_TEXT;
use crate::ocr::OCR_FAILURE_TEXT;
use crate::transcript::{CourseRecord, EstimatedScores, PotentialGain, TranscriptAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum UploadPhase {
    Idle,
    Recognizing,
    Recognized,
    GeneratingPlan,
    PlanReady,
    PlanFailed,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Recognizing => "recognizing",
            Self::Recognized => "recognized",
            Self::GeneratingPlan => "generatingPlan",
            Self::PlanReady => "planReady",
            Self::PlanFailed => "planFailed",
        };
        f.write_str(s)
    }
}

/// Inputs that move a session between phases.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    FileSelected { file_name: String },
    OcrResolved { text: String },
    OcrFailed { placeholder: String },
    PlanRequested,
    PlanResolved { plan: String },
    PlanFailed { placeholder: String },
}

impl UploadEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::FileSelected { .. } => "file selected",
            Self::OcrResolved { .. } => "OCR resolved",
            Self::OcrFailed { .. } => "OCR failed",
            Self::PlanRequested => "plan requested",
            Self::PlanResolved { .. } => "plan resolved",
            Self::PlanFailed { .. } => "plan failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("cannot apply '{event}' while {phase}")]
    InvalidTransition {
        phase: UploadPhase,
        event: &'static str,
    },
    #[error("no courses to build a plan from")]
    NoCourses,
}

/// Whether an event changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The event belonged to an earlier upload and was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    phase: UploadPhase,
    generation: u64,
    file_name: Option<String>,
    extracted_text: Option<String>,
    analysis: Option<TranscriptAnalysis>,
    plan: Option<String>,
    touched_at: Instant,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            phase: UploadPhase::Idle,
            generation: 0,
            file_name: None,
            extracted_text: None,
            analysis: None,
            plan: None,
            touched_at: Instant::now(),
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn courses(&self) -> &[CourseRecord] {
        self.analysis
            .as_ref()
            .map(|a| a.courses.as_slice())
            .unwrap_or_default()
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    /// Start a new upload; returns its generation.
    pub fn select_file(&mut self, file_name: impl Into<String>) -> Result<u64, SessionError> {
        let generation = self.generation + 1;
        self.apply(
            generation,
            UploadEvent::FileSelected {
                file_name: file_name.into(),
            },
        )?;
        Ok(generation)
    }

    fn is_in_flight(&self) -> bool {
        matches!(
            self.phase,
            UploadPhase::Recognizing | UploadPhase::GeneratingPlan
        )
    }

    /// Resolve an upstream call pending for longer than `limit` as failed.
    ///
    /// Returns whether the session changed.
    pub fn fail_if_stalled(&mut self, limit: Duration) -> bool {
        if !self.is_in_flight() || self.touched_at.elapsed() <= limit {
            return false;
        }
        let event = match self.phase {
            UploadPhase::Recognizing => UploadEvent::OcrFailed {
                placeholder: OCR_FAILURE_TEXT.to_owned(),
            },
            _ => UploadEvent::PlanFailed {
                placeholder: PLAN_FAILURE_TEXT.to_owned(),
            },
        };
        matches!(self.apply(self.generation, event), Ok(Transition::Applied))
    }

    fn restart(&mut self, generation: u64, file_name: String) {
        *self = Self {
            phase: UploadPhase::Recognizing,
            generation,
            file_name: Some(file_name),
            ..Self::new()
        };
    }

    /// Begin plan generation for the current upload; returns its generation.
    pub fn request_plan(&mut self) -> Result<u64, SessionError> {
        self.apply(self.generation, UploadEvent::PlanRequested)?;
        Ok(self.generation)
    }

    /// Apply an event produced under `generation`.
    pub fn apply(&mut self, generation: u64, event: UploadEvent) -> Result<Transition, SessionError> {
        use UploadPhase::*;

        if let UploadEvent::FileSelected { file_name } = event {
            if generation <= self.generation {
                return Ok(Transition::Stale);
            }
            self.restart(generation, file_name);
            return Ok(Transition::Applied);
        }

        if generation != self.generation {
            return Ok(Transition::Stale);
        }

        match (self.phase, event) {
            (Recognizing, UploadEvent::OcrResolved { text }) => {
                self.analysis = Some(TranscriptAnalysis::from_text(&text));
                self.extracted_text = Some(text);
                self.phase = Recognized;
            }
            (Recognizing, UploadEvent::OcrFailed { placeholder }) => {
                self.extracted_text = Some(placeholder);
                self.analysis = None;
                self.phase = Recognized;
            }
            (Recognized | PlanReady | PlanFailed, UploadEvent::PlanRequested) => {
                if self.courses().is_empty() {
                    return Err(SessionError::NoCourses);
                }
                self.plan = None;
                self.phase = GeneratingPlan;
            }
            (GeneratingPlan, UploadEvent::PlanResolved { plan }) => {
                self.plan = Some(plan);
                self.phase = PlanReady;
            }
            (GeneratingPlan, UploadEvent::PlanFailed { placeholder }) => {
                self.plan = Some(placeholder);
                self.phase = PlanFailed;
            }
            (phase, event) => {
                return Err(SessionError::InvalidTransition {
                    phase,
                    event: event.name(),
                });
            }
        }

        self.touched_at = Instant::now();
        Ok(Transition::Applied)
    }

    pub fn snapshot(&self, id: &str) -> SessionSnapshot {
        let analysis = self.analysis.as_ref();
        SessionSnapshot {
            id: id.to_owned(),
            phase: self.phase,
            generation: self.generation,
            file_name: self.file_name.clone(),
            extracted_text: self.extracted_text.clone(),
            courses: self.courses().to_vec(),
            estimated_scores: analysis.map(|a| a.estimated_scores),
            potential_gains: analysis
                .map(|a| a.potential_gains.clone())
                .unwrap_or_default(),
            plan: self.plan.clone(),
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionSnapshot {
    pub id: String,
    pub phase: UploadPhase,
    #[ts(type = "number")]
    pub generation: u64,
    pub file_name: Option<String>,
    pub extracted_text: Option<String>,
    pub courses: Vec<CourseRecord>,
    pub estimated_scores: Option<EstimatedScores>,
    pub potential_gains: Vec<PotentialGain>,
    pub plan: Option<String>,
}

/// In-memory session registry keyed by ULID.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<String, UploadSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> String {
        let id = ulid::Ulid::new().to_string();
        self.inner.insert(id.clone(), UploadSession::new());
        id
    }

    /// Run `f` against a session. The map guard is released before returning, so
    /// callers can await between calls.
    pub fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut UploadSession) -> T,
    ) -> Result<T, SessionError> {
        let mut entry = self.inner.get_mut(id).ok_or(SessionError::NotFound)?;
        Ok(f(entry.value_mut()))
    }

    pub fn snapshot(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        self.with_session(id, |s| s.snapshot(id))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop sessions idle for longer than `ttl`, except those awaiting a result.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.inner.len();
        self.inner
            .retain(|_, s| s.is_in_flight() || s.touched_at.elapsed() <= ttl);
        before.saturating_sub(self.inner.len())
    }

    /// Fail upstream calls pending longer than `in_flight_limit`, making those
    /// sessions usable again and subject to normal eviction.
    pub fn fail_stalled(&self, in_flight_limit: Duration) -> usize {
        let mut failed = 0;
        for mut entry in self.inner.iter_mut() {
            if entry.value_mut().fail_if_stalled(in_flight_limit) {
                failed += 1;
            }
        }
        failed
    }

    /// Periodically fail stalled calls and evict idle sessions until the process exits.
    pub fn spawn_eviction(&self, ttl: Duration, in_flight_limit: Duration) {
        let store = self.clone();
        let period = (ttl.min(in_flight_limit) / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // skip the immediate first tick
            loop {
                ticker.tick().await;
                let stalled = store.fail_stalled(in_flight_limit);
                if stalled > 0 {
                    tracing::warn!(stalled, "Failed sessions stuck awaiting an upstream call");
                }
                let evicted = store.evict_idle(ttl);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = store.len(), "Evicted idle sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Grade;

    fn recognized(text: &str) -> UploadSession {
        let mut session = UploadSession::new();
        let generation = session.select_file("transcript.png").unwrap();
        session
            .apply(generation, UploadEvent::OcrResolved { text: text.into() })
            .unwrap();
        session
    }

    #[test]
    fn test_happy_path() {
        let mut session = recognized("AP Calculus BC - A\nEnglish 11 - B");
        assert_eq!(session.phase(), UploadPhase::Recognized);
        assert_eq!(session.courses()[0], CourseRecord::new("AP Calculus BC", Grade::A));

        let generation = session.request_plan().unwrap();
        assert_eq!(session.phase(), UploadPhase::GeneratingPlan);

        session
            .apply(generation, UploadEvent::PlanResolved { plan: "Day 1: Go".into() })
            .unwrap();
        assert_eq!(session.phase(), UploadPhase::PlanReady);
        assert_eq!(session.plan(), Some("Day 1: Go"));

        let snap = session.snapshot("abc");
        assert_eq!(snap.estimated_scores.unwrap().math, 700);
        assert_eq!(snap.estimated_scores.unwrap().english, 520);
    }

    #[test]
    fn test_ocr_failure_keeps_flow_moving() {
        let mut session = UploadSession::new();
        let generation = session.select_file("blurry.jpg").unwrap();
        session
            .apply(
                generation,
                UploadEvent::OcrFailed {
                    placeholder: "Failed to extract text from image.".into(),
                },
            )
            .unwrap();
        assert_eq!(session.phase(), UploadPhase::Recognized);
        let snap = session.snapshot("x");
        assert_eq!(
            snap.extracted_text.as_deref(),
            Some("Failed to extract text from image.")
        );
        assert!(snap.courses.is_empty());
        assert_eq!(session.request_plan(), Err(SessionError::NoCourses));
    }

    #[test]
    fn test_plan_failure_is_distinct_from_empty_plan() {
        let mut failed = recognized("Geometry - A");
        let g = failed.request_plan().unwrap();
        failed
            .apply(g, UploadEvent::PlanFailed { placeholder: "nope".into() })
            .unwrap();
        assert_eq!(failed.phase(), UploadPhase::PlanFailed);

        let mut empty = recognized("Geometry - A");
        let g = empty.request_plan().unwrap();
        empty
            .apply(g, UploadEvent::PlanResolved { plan: String::new() })
            .unwrap();
        assert_eq!(empty.phase(), UploadPhase::PlanReady);
        assert_eq!(empty.plan(), Some(""));
    }

    #[test]
    fn test_new_upload_makes_pending_results_stale() {
        let mut session = recognized("Geometry - A");
        let old = session.request_plan().unwrap();

        let new = session.select_file("second.png").unwrap();
        assert!(new > old);
        assert_eq!(session.phase(), UploadPhase::Recognizing);

        let outcome = session
            .apply(old, UploadEvent::PlanResolved { plan: "old plan".into() })
            .unwrap();
        assert_eq!(outcome, Transition::Stale);
        assert_eq!(session.phase(), UploadPhase::Recognizing);
        assert_eq!(session.plan(), None);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = UploadSession::new();
        assert_eq!(
            session.request_plan(),
            Err(SessionError::InvalidTransition {
                phase: UploadPhase::Idle,
                event: "plan requested",
            })
        );

        let g = session.select_file("a.png").unwrap();
        assert!(matches!(
            session.apply(g, UploadEvent::PlanResolved { plan: "x".into() }),
            Err(SessionError::InvalidTransition {
                phase: UploadPhase::Recognizing,
                ..
            })
        ));
        assert!(matches!(
            session.request_plan(),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_replan_from_ready() {
        let mut session = recognized("Algebra 1 - B");
        let g = session.request_plan().unwrap();
        session
            .apply(g, UploadEvent::PlanResolved { plan: "one".into() })
            .unwrap();
        assert!(session.request_plan().is_ok());
        assert_eq!(session.plan(), None);
    }

    #[test]
    fn test_store_roundtrip_and_eviction() {
        let store = SessionStore::new();
        let id = store.create();
        assert_eq!(store.snapshot(&id).unwrap().phase, UploadPhase::Idle);
        assert_eq!(store.snapshot("missing"), Err(SessionError::NotFound));

        store
            .with_session(&id, |s| s.select_file("t.png"))
            .unwrap()
            .unwrap();
        // Sessions awaiting OCR survive even a zero TTL.
        assert_eq!(store.evict_idle(Duration::ZERO), 0);

        store
            .with_session(&id, |s| {
                let g = s.generation();
                s.apply(g, UploadEvent::OcrResolved { text: "Physics - A".into() })
            })
            .unwrap()
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.evict_idle(Duration::ZERO), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_selected_event() {
        let mut session = recognized("Geometry - A");
        assert_eq!(session.generation(), 1);

        let outcome = session
            .apply(
                1,
                UploadEvent::FileSelected {
                    file_name: "late.png".into(),
                },
            )
            .unwrap();
        assert_eq!(outcome, Transition::Stale);
        assert_eq!(session.phase(), UploadPhase::Recognized);

        let outcome = session
            .apply(
                5,
                UploadEvent::FileSelected {
                    file_name: "next.png".into(),
                },
            )
            .unwrap();
        assert_eq!(outcome, Transition::Applied);
        assert_eq!(session.generation(), 5);
        assert_eq!(session.phase(), UploadPhase::Recognizing);
        assert!(session.courses().is_empty());
    }

    #[test]
    fn test_stalled_calls_fail_after_limit() {
        let mut session = recognized("Algebra 2 - B");
        session.request_plan().unwrap();
        assert!(!session.fail_if_stalled(Duration::from_secs(60)));
        assert_eq!(session.phase(), UploadPhase::GeneratingPlan);

        std::thread::sleep(Duration::from_millis(5));
        assert!(session.fail_if_stalled(Duration::ZERO));
        assert_eq!(session.phase(), UploadPhase::PlanFailed);
        assert_eq!(session.plan(), Some(PLAN_FAILURE_TEXT));
        assert!(session.request_plan().is_ok());

        let mut uploading = UploadSession::new();
        uploading.select_file("t.png").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(uploading.fail_if_stalled(Duration::ZERO));
        assert_eq!(
            uploading.snapshot("u").extracted_text.as_deref(),
            Some(OCR_FAILURE_TEXT)
        );
    }

    #[test]
    fn test_stalled_sessions_become_evictable() {
        let store = SessionStore::new();
        let id = store.create();
        store
            .with_session(&id, |s| s.select_file("t.png"))
            .unwrap()
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.evict_idle(Duration::ZERO), 0);
        assert_eq!(store.fail_stalled(Duration::ZERO), 1);
        assert_eq!(store.snapshot(&id).unwrap().phase, UploadPhase::Recognized);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.evict_idle(Duration::ZERO), 1);
    }
}
