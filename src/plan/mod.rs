//! Study plan structuring and review payloads.

pub mod review;
pub mod segment;

pub use review::{PlanReview, StudyPlanData};
pub use segment::{StudyDay, Task, segment_plan};
