//! Study plan generation and review handlers.

use axum::extract::{RawQuery, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::llm::generate_plan_or_sentinel;
use crate::plan::review::{NO_PLAN_MESSAGE, PlanReview, StudyPlanData, plan_from_query};
use crate::plan::{StudyDay, segment_plan};
use crate::state::AppState;
use crate::transcript::CourseRecord;
use crate::web::error::ApiError;
use crate::web::extract::ApiJson;

#[derive(Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GeneratePlanRequest {
    pub courses_and_grades: Vec<CourseRecord>,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct GeneratePlanResponse {
    pub plan: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DayByDayResponse {
    pub plan: Option<String>,
    pub study_days: Vec<StudyDay>,
    pub message: Option<String>,
}

/// `POST /api/generate-plan`
///
/// Upstream failures never surface as HTTP errors; the plan is replaced by a
/// fixed failure string instead.
pub(super) async fn generate_plan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GeneratePlanRequest>,
) -> Json<GeneratePlanResponse> {
    let plan = generate_plan_or_sentinel(state.planner.as_ref(), &body.courses_and_grades)
        .await
        .unwrap_or_else(|sentinel| sentinel);
    Json(GeneratePlanResponse { plan })
}

/// `POST /api/review` with the stored `studyPlanData` blob.
pub(super) async fn review(body: String) -> Result<Json<PlanReview>, ApiError> {
    let data = StudyPlanData::from_json(&body)?;
    Ok(Json(PlanReview::build(&data)))
}

/// `GET /api/day-by-day?plan={url-encoded plan}`
pub(super) async fn day_by_day(RawQuery(query): RawQuery) -> Json<DayByDayResponse> {
    let response = match plan_from_query(query.as_deref()) {
        Some(plan) => DayByDayResponse {
            study_days: segment_plan(&plan),
            plan: Some(plan),
            message: None,
        },
        None => DayByDayResponse {
            plan: None,
            study_days: Vec::new(),
            message: Some(NO_PLAN_MESSAGE.to_owned()),
        },
    };
    Json(response)
}
