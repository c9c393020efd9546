//! Planner errors as HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mymoney_core::planner::PlanError;
use mymoney_shared::{AppError, Money};
use serde_json::json;
use tracing::error;

/// Classifies a planner error for the API.
#[must_use]
pub fn to_app_error(err: &PlanError) -> AppError {
    match err {
        PlanError::Validation { field, reason } => {
            AppError::InvalidInput(format!("{field} {reason}"))
        }
        PlanError::InfeasiblePlan {
            max_expense_per_month,
        } => AppError::Infeasible(format!(
            "Monthly income is less than the required monthly saving (max expense per month \
             would be {}). Increase the duration or lower the target.",
            Money::new(*max_expense_per_month)
        )),
        PlanError::Overflow { quantity } => AppError::InvalidInput(format!(
            "The amounts are too large to plan with ({quantity} is out of range)."
        )),
        PlanError::NotReady => {
            AppError::OutOfSequence("Calculate a plan and start saving first.".to_string())
        }
        PlanError::AlreadyActive => AppError::OutOfSequence(
            "A saving plan is already active. End it before starting a new one.".to_string(),
        ),
        PlanError::NoPriorPlan => {
            AppError::OutOfSequence("There is no started plan to recalculate.".to_string())
        }
        PlanError::MalformedAllocation(_) | PlanError::Repository(_) => {
            AppError::Storage(err.to_string())
        }
        PlanError::InvalidCategoryName(_)
        | PlanError::WorkerStopped
        | PlanError::ActionAborted => {
            AppError::Internal(err.to_string())
        }
    }
}

/// Error response carrying a [`PlanError`].
#[derive(Debug)]
pub struct ApiError(pub PlanError);

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let app_error = to_app_error(&self.0);
        let status = StatusCode::from_u16(app_error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if !app_error.is_client_error() {
            error!(error = %self.0, "Planner action failed");
            return (
                status,
                Json(json!({
                    "error": "internal_error",
                    "message": app_error.user_message()
                })),
            )
                .into_response();
        }

        let mut body = json!({
            "error": self.0.code(),
            "message": app_error.user_message()
        });
        if let PlanError::InfeasiblePlan {
            max_expense_per_month,
        } = self.0
        {
            body["max_expense_per_month"] = json!(max_expense_per_month);
        }
        (status, Json(body)).into_response()
    }
}
