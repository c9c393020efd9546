//! Plan state repository.
//!
//! Stores the planner's single plan record in the `plan_state` key/value
//! table, one row per field that is set.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use mymoney_core::planner::{PlanError, PlanRepository, PlanState};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use tracing::debug;

use crate::entities::plan_state;

/// Keys of the persisted plan fields.
pub mod keys {
    /// Whether a plan is running (`true` / `false`).
    pub const IS_ACTIVE: &str = "isActive";
    /// Total amount to save.
    pub const TARGET_AMOUNT: &str = "targetAmount";
    /// Planning horizon in months.
    pub const DURATION_MONTHS: &str = "durationMonths";
    /// Monthly income.
    pub const MONTHLY_INCOME: &str = "monthlyIncome";
    /// Required saving per month.
    pub const SAVING_PER_MONTH: &str = "savingPerMonth";
    /// Spending cap per month.
    pub const MAX_EXPENSE_PER_MONTH: &str = "maxExpensePerMonth";
    /// Cumulative manual savings.
    pub const MANUAL_SAVINGS: &str = "manualSavings";
    /// Plan start, RFC 3339.
    pub const STARTED_AT: &str = "startedAt";
    /// Encoded category allocation plan.
    pub const CATEGORY_ALLOCATION_PLAN: &str = "categoryAllocationPlan";
}

fn db_error(e: DbErr) -> PlanError {
    PlanError::repository(e.to_string())
}

fn corrupt(key: &str, value: &str) -> PlanError {
    PlanError::repository(format!("corrupt plan state: {key}={value:?}"))
}

/// Flattens a plan record into key/value rows. Unset fields produce no row.
#[must_use]
pub fn to_rows(state: &PlanState) -> Vec<(&'static str, String)> {
    let decimals = [
        (keys::TARGET_AMOUNT, state.target_amount),
        (keys::DURATION_MONTHS, state.duration_months),
        (keys::MONTHLY_INCOME, state.monthly_income),
        (keys::SAVING_PER_MONTH, state.saving_per_month),
        (keys::MAX_EXPENSE_PER_MONTH, state.max_expense_per_month),
        (keys::MANUAL_SAVINGS, state.manual_savings),
    ];

    let mut rows = vec![(keys::IS_ACTIVE, state.is_active.to_string())];
    rows.extend(
        decimals
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v.normalize().to_string()))),
    );
    if let Some(started_at) = state.started_at {
        rows.push((keys::STARTED_AT, started_at.to_rfc3339()));
    }
    if let Some(plan) = &state.category_allocation_plan {
        rows.push((keys::CATEGORY_ALLOCATION_PLAN, plan.clone()));
    }
    rows
}

/// Rebuilds a plan record from key/value rows. Unknown keys are ignored.
///
/// # Errors
///
/// Returns `PlanError::Repository` for a value that cannot be parsed.
pub fn from_rows<I, K, V>(rows: I) -> Result<PlanState, PlanError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut state = PlanState::default();
    for (key, value) in rows {
        let (key, value) = (key.as_ref(), value.as_ref());
        let decimal = || Decimal::from_str(value).map_err(|_| corrupt(key, value));
        match key {
            keys::IS_ACTIVE => {
                state.is_active = value.parse().map_err(|_| corrupt(key, value))?;
            }
            keys::TARGET_AMOUNT => state.target_amount = Some(decimal()?),
            keys::DURATION_MONTHS => state.duration_months = Some(decimal()?),
            keys::MONTHLY_INCOME => state.monthly_income = Some(decimal()?),
            keys::SAVING_PER_MONTH => state.saving_per_month = Some(decimal()?),
            keys::MAX_EXPENSE_PER_MONTH => state.max_expense_per_month = Some(decimal()?),
            keys::MANUAL_SAVINGS => state.manual_savings = Some(decimal()?),
            keys::STARTED_AT => {
                let started_at = DateTime::parse_from_rfc3339(value)
                    .map_err(|_| corrupt(key, value))?
                    .with_timezone(&Utc);
                state.started_at = Some(started_at);
            }
            keys::CATEGORY_ALLOCATION_PLAN => {
                state.category_allocation_plan = Some(value.to_string());
            }
            _ => {}
        }
    }
    Ok(state)
}

/// Repository for the persisted plan record.
#[derive(Debug, Clone)]
pub struct PlanStateRepository {
    db: DatabaseConnection,
}

impl PlanStateRepository {
    /// Create a new plan state repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl PlanRepository for PlanStateRepository {
    async fn load(&self) -> Result<PlanState, PlanError> {
        let rows = plan_state::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_error)?;
        from_rows(rows.into_iter().map(|row| (row.key, row.value)))
    }

    async fn save(&self, state: &PlanState) -> Result<(), PlanError> {
        let rows: Vec<plan_state::ActiveModel> = to_rows(state)
            .into_iter()
            .map(|(key, value)| plan_state::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
            })
            .collect();
        let count = rows.len();

        // Replace the whole record in one transaction
        let txn = self.db.begin().await.map_err(db_error)?;
        plan_state::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        plan_state::Entity::insert_many(rows)
            .exec_without_returning(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        debug!(fields = count, "Plan state saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), PlanError> {
        let result = plan_state::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        debug!(rows = result.rows_affected, "Plan state cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn full_state() -> PlanState {
        PlanState {
            is_active: true,
            target_amount: Some(dec!(12000000)),
            duration_months: Some(dec!(1.5)),
            monthly_income: Some(dec!(5000000)),
            saving_per_month: Some(dec!(8000000)),
            max_expense_per_month: Some(dec!(-3000000)),
            manual_savings: Some(dec!(250000.50)),
            started_at: Some(Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()),
            category_allocation_plan: Some("Food=1;Home=2;".to_string()),
        }
    }

    #[test]
    fn test_rows_use_record_keys() {
        let rows = to_rows(&full_state());
        let get = |key: &str| {
            rows.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(rows.len(), 9);
        assert_eq!(get("isActive"), Some("true"));
        assert_eq!(get("durationMonths"), Some("1.5"));
        assert_eq!(get("manualSavings"), Some("250000.5"));
        assert_eq!(get("startedAt"), Some("2026-10-19T08:30:00+00:00"));
        assert_eq!(get("categoryAllocationPlan"), Some("Food=1;Home=2;"));
    }

    #[test]
    fn test_unset_fields_have_no_row() {
        let rows = to_rows(&PlanState::default());
        assert_eq!(rows, vec![("isActive", "false".to_string())]);
    }

    #[test]
    fn test_rows_rebuild_state() {
        let state = full_state();
        let rebuilt = from_rows(to_rows(&state)).unwrap();
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn test_empty_rows_are_default_state() {
        let rows: Vec<(String, String)> = Vec::new();
        assert_eq!(from_rows(rows).unwrap(), PlanState::default());
    }

    #[test]
    fn test_corrupt_value_is_repository_error() {
        let err = from_rows([("targetAmount", "lots")]).unwrap_err();
        assert!(matches!(err, PlanError::Repository(_)));

        let err = from_rows([("startedAt", "yesterday")]).unwrap_err();
        assert!(matches!(err, PlanError::Repository(_)));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let state = from_rows([("isActive", "true"), ("legacy", "x")]).unwrap();
        assert!(state.is_active);
    }
}
