//! Savings plan routes.
//!
//! Each handler forwards one user trigger to the planner worker and returns
//! the structured result together with the rendered status text.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use mymoney_core::planner::{PlanInput, Render, calendar::local_date, plan_started};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

/// Request body for recording a saving.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SavingRequest {
    /// Amount as typed by the user.
    pub amount: String,
}

/// Creates plan routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plan", get(get_state))
        .route("/plan/calculate", post(calculate))
        .route("/plan/start", post(start))
        .route("/plan/progress", get(progress))
        .route("/plan/savings", post(record_saving))
        .route("/plan/end", post(end))
}

/// GET /plan - Persisted plan state.
async fn get_state(State(state): State<AppState>) -> Result<Response, ApiError> {
    let plan_state = state.planner.current_state().await?;
    Ok((StatusCode::OK, Json(json!({ "state": plan_state }))).into_response())
}

/// POST /plan/calculate - Calculate a plan, or re-balance the active one.
async fn calculate(
    State(state): State<AppState>,
    Json(input): Json<PlanInput>,
) -> Result<Response, ApiError> {
    let outcome = state.planner.calculate(input, Utc::now()).await?;
    let message = outcome.render(&state.currency_label);
    Ok((
        StatusCode::OK,
        Json(json!({ "outcome": outcome, "message": message })),
    )
        .into_response())
}

/// POST /plan/start - Start saving with the calculated plan.
async fn start(State(state): State<AppState>) -> Result<Response, ApiError> {
    let plan = state.planner.start(Utc::now()).await?;
    let tz = state.planner.options().time_zone;
    let message = plan
        .started_at
        .map(|started_at| plan_started(local_date(started_at, tz)))
        .unwrap_or_default();
    info!("Savings plan started via API");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "plan": plan, "message": message })),
    )
        .into_response())
}

/// GET /plan/progress - Progress of the active plan.
async fn progress(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.planner.check_progress(Utc::now()).await?;
    let message = outcome.render(&state.currency_label);
    Ok((
        StatusCode::OK,
        Json(json!({ "progress": outcome, "message": message })),
    )
        .into_response())
}

/// POST /plan/savings - Add to the manually recorded savings.
async fn record_saving(
    State(state): State<AppState>,
    Json(body): Json<SavingRequest>,
) -> Result<Response, ApiError> {
    let record = state.planner.record_saving(body.amount).await?;
    let message = record.render(&state.currency_label);
    Ok((
        StatusCode::OK,
        Json(json!({ "saving": record, "message": message })),
    )
        .into_response())
}

/// POST /plan/end - End the active plan and clear all state.
async fn end(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.planner.end().await?;
    let message = outcome.render(&state.currency_label);
    Ok((
        StatusCode::OK,
        Json(json!({ "outcome": outcome, "message": message })),
    )
        .into_response())
}
