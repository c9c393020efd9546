//! Planner error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Budget planner errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A numeric input is missing, not a number, or out of range.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending input.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Monthly income does not cover the required monthly saving.
    #[error("plan is infeasible: maximum monthly expense would be {max_expense_per_month}")]
    InfeasiblePlan {
        /// The computed (negative) monthly spending cap.
        max_expense_per_month: Decimal,
    },

    /// An amount is too large to compute with.
    #[error("{quantity} is out of range")]
    Overflow {
        /// Name of the quantity that could not be computed.
        quantity: &'static str,
    },

    /// A plan must be calculated before it can be started, and started
    /// before savings can be recorded.
    #[error("no calculated plan is ready")]
    NotReady,

    /// A plan is already running.
    #[error("a savings plan is already active")]
    AlreadyActive,

    /// Recalculation requires a started plan.
    #[error("no prior plan to recalculate")]
    NoPriorPlan,

    /// The persisted allocation plan could not be parsed.
    #[error("malformed allocation plan: {0}")]
    MalformedAllocation(String),

    /// A category name cannot be stored in the allocation plan.
    #[error("invalid category name: {0:?}")]
    InvalidCategoryName(String),

    /// A collaborator (plan store or expense query) failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// The planner worker is no longer running.
    #[error("planner worker stopped")]
    WorkerStopped,

    /// A queued action ended without producing a result.
    #[error("planner action aborted")]
    ActionAborted,
}

impl PlanError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Create an overflow error.
    #[must_use]
    pub const fn overflow(quantity: &'static str) -> Self {
        Self::Overflow { quantity }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Returns true if the user can recover by re-entering input or
    /// completing a prior step.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::InfeasiblePlan { .. }
                | Self::Overflow { .. }
                | Self::NotReady
                | Self::AlreadyActive
                | Self::NoPriorPlan
                | Self::InvalidCategoryName(_)
        )
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InfeasiblePlan { .. } => "infeasible_plan",
            Self::Overflow { .. } => "out_of_range",
            Self::NotReady => "not_ready",
            Self::AlreadyActive => "already_active",
            Self::NoPriorPlan => "no_prior_plan",
            Self::MalformedAllocation(_) => "malformed_allocation",
            Self::InvalidCategoryName(_) => "invalid_category_name",
            Self::Repository(_) => "repository_error",
            Self::WorkerStopped => "worker_stopped",
            Self::ActionAborted => "action_aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_display() {
        let err = PlanError::validation("target_amount", "is required");
        assert_eq!(err.to_string(), "invalid target_amount: is required");
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_infeasible_carries_value() {
        let err = PlanError::InfeasiblePlan {
            max_expense_per_month: dec!(-3000000),
        };
        assert!(err.to_string().contains("-3000000"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_runtime_failures_not_recoverable() {
        assert!(!PlanError::repository("disk full").is_recoverable());
        assert!(!PlanError::MalformedAllocation("x".into()).is_recoverable());
        assert!(!PlanError::WorkerStopped.is_recoverable());
        assert!(!PlanError::ActionAborted.is_recoverable());
    }

    #[test]
    fn test_overflow_names_quantity() {
        let err = PlanError::overflow("saving_per_month");
        assert_eq!(err.to_string(), "saving_per_month is out of range");
        assert_eq!(err.code(), "out_of_range");
        assert!(err.is_recoverable());
    }
}
