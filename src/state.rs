//! Application state shared across request handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::llm::PlanGenerator;
use crate::ocr::TextRecognizer;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub planner: Arc<dyn PlanGenerator>,
    pub sessions: SessionStore,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, planner: Arc<dyn PlanGenerator>) -> Self {
        Self {
            recognizer,
            planner,
            sessions: SessionStore::new(),
            started_at: Instant::now(),
        }
    }
}
