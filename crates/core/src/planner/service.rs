//! Budget planner service.
//!
//! Every operation reads the persisted plan once when it starts and writes
//! the whole record once when it ends. A failing operation writes nothing.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use mymoney_shared::{AppError, PlannerConfig};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::allocation::CategoryAllocations;
use super::calendar::{
    ElapsedTime, RemainingTime, elapsed_days, local_date, months_before, spending_window_start,
};
use super::error::PlanError;
use super::rebalance::Rebalance;
use super::types::{
    CalculateOutcome, CategoryExpense, CategoryProgress, EndOutcome, MonthlyFigures, Plan,
    PlanInput, PlanState, ProgressOutcome, ProgressReport, RebalanceReport, SavingRecord,
    parse_positive,
};

/// Message shown when progress cannot be computed.
pub const PROGRESS_FAILED_MESSAGE: &str = "error checking progress";

/// Persistence of the single plan record.
///
/// This trait is implemented by the db crate.
pub trait PlanRepository: Send + Sync {
    /// Load the plan record. Unset fields are `None`.
    fn load(&self) -> impl Future<Output = Result<PlanState, PlanError>> + Send;

    /// Replace the plan record as one atomic write.
    fn save(&self, state: &PlanState) -> impl Future<Output = Result<(), PlanError>> + Send;

    /// Remove every persisted field.
    fn clear(&self) -> impl Future<Output = Result<(), PlanError>> + Send;
}

/// Read-only expense aggregation.
///
/// Rows are one per category and only for totals greater than zero.
pub trait ExpenseSource: Send + Sync {
    /// Spend per category since `start`.
    fn expenses_by_category_since(
        &self,
        start: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<CategoryExpense>, PlanError>> + Send;

    /// Spend per category in `[start, end]`.
    fn expenses_by_category_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<CategoryExpense>, PlanError>> + Send;

    /// Total spend across all categories since `start`.
    fn total_expense_since(
        &self,
        start: DateTime<Utc>,
    ) -> impl Future<Output = Result<Decimal, PlanError>> + Send;
}

/// Planner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Zone whose calendar days and months are counted.
    pub time_zone: Tz,
    /// Months of history used for proportional allocation.
    pub history_months: u32,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::Asia::Ho_Chi_Minh,
            history_months: 3,
        }
    }
}

impl TryFrom<&PlannerConfig> for PlannerOptions {
    type Error = AppError;

    fn try_from(config: &PlannerConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            time_zone: config.time_zone()?,
            history_months: config.history_months,
        })
    }
}

/// The budget planner.
pub struct BudgetPlanner<R: PlanRepository, E: ExpenseSource> {
    repo: Arc<R>,
    expenses: Arc<E>,
    options: PlannerOptions,
}

impl<R: PlanRepository, E: ExpenseSource> BudgetPlanner<R, E> {
    /// Create a new planner.
    #[must_use]
    pub fn new(repo: Arc<R>, expenses: Arc<E>, options: PlannerOptions) -> Self {
        Self {
            repo,
            expenses,
            options,
        }
    }

    /// Planner settings.
    #[must_use]
    pub const fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// The persisted plan record as it is now.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Repository` if the store cannot be read.
    pub async fn current_state(&self) -> Result<PlanState, PlanError> {
        self.repo.load().await
    }

    /// Calculate a new plan and save it as a draft for [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An input is missing, non-numeric or not positive
    /// - The monthly spending cap would be negative
    /// - A plan is already active
    /// - The store or the expense query fails
    pub async fn calculate(&self, input: &PlanInput, now: DateTime<Utc>) -> Result<Plan, PlanError> {
        let (target, duration, income) = input.parse()?;
        let state = self.repo.load().await?;
        self.calculate_from(&state, (target, duration, income), now)
            .await
    }

    /// The "calculate" trigger: re-balances an active plan, otherwise
    /// calculates a new one.
    ///
    /// # Errors
    ///
    /// See [`Self::calculate`] and [`Self::recalculate`].
    pub async fn calculate_or_recalculate(
        &self,
        input: &PlanInput,
        now: DateTime<Utc>,
    ) -> Result<CalculateOutcome, PlanError> {
        let state = self.repo.load().await?;
        if state.is_active {
            return self
                .recalculate_from(&state, now)
                .await
                .map(CalculateOutcome::Recalculated);
        }
        let inputs = input.parse()?;
        self.calculate_from(&state, inputs, now)
            .await
            .map(CalculateOutcome::Calculated)
    }

    async fn calculate_from(
        &self,
        state: &PlanState,
        (target, duration, income): (Decimal, Decimal, Decimal),
        now: DateTime<Utc>,
    ) -> Result<Plan, PlanError> {
        if state.is_active {
            warn!("Calculate requested while a plan is active");
            return Err(PlanError::AlreadyActive);
        }

        let figures = MonthlyFigures::compute(target, duration, income)?;
        if !figures.is_feasible() {
            warn!(
                max_expense_per_month = %figures.max_expense_per_month,
                "Plan is infeasible"
            );
            return Err(PlanError::InfeasiblePlan {
                max_expense_per_month: figures.max_expense_per_month,
            });
        }

        let history = self.history(now).await?;
        let allocations =
            CategoryAllocations::proportional(&history, figures.max_expense_per_month)?;
        let encoded = allocations.encode()?;

        let draft = PlanState {
            is_active: false,
            target_amount: Some(target),
            duration_months: Some(duration),
            monthly_income: Some(income),
            saving_per_month: Some(figures.saving_per_month),
            max_expense_per_month: Some(figures.max_expense_per_month),
            manual_savings: None,
            started_at: None,
            category_allocation_plan: Some(encoded),
        };
        self.repo.save(&draft).await?;

        info!(
            target_amount = %target,
            duration_months = %duration,
            saving_per_month = %figures.saving_per_month,
            max_expense_per_month = %figures.max_expense_per_month,
            categories = allocations.len(),
            "Plan calculated"
        );

        Ok(Plan {
            target_amount: target,
            duration_months: duration,
            monthly_income: income,
            figures,
            started_at: None,
            manual_savings: Decimal::ZERO,
            is_active: false,
            category_allocations: allocations,
        })
    }

    /// Start saving with the calculated plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NotReady` if no plan was calculated,
    /// `PlanError::AlreadyActive` if one is running, or a store error.
    pub async fn start(&self, now: DateTime<Utc>) -> Result<Plan, PlanError> {
        let state = self.repo.load().await?;
        if state.is_active {
            warn!("Start requested while a plan is active");
            return Err(PlanError::AlreadyActive);
        }
        let Some((target, duration, income)) = state.inputs() else {
            warn!("Start requested before a plan was calculated");
            return Err(PlanError::NotReady);
        };
        let figures = MonthlyFigures::compute(target, duration, income)?;

        let started = PlanState {
            is_active: true,
            saving_per_month: Some(figures.saving_per_month),
            max_expense_per_month: Some(figures.max_expense_per_month),
            manual_savings: Some(Decimal::ZERO),
            started_at: Some(now),
            ..state
        };
        let plan = Plan::from_state(&started)?;
        self.repo.save(&started).await?;

        info!(
            target_amount = %target,
            duration_months = %duration,
            started_at = %now,
            "Saving plan started"
        );
        Ok(plan)
    }

    /// End the active plan and reset every persisted field.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Repository` if the store fails.
    pub async fn end(&self) -> Result<EndOutcome, PlanError> {
        let state = self.repo.load().await?;
        if !state.is_active {
            info!("End requested with no active plan");
            return Ok(EndOutcome::NothingToEnd);
        }
        self.repo.clear().await?;
        info!("Saving plan ended");
        Ok(EndOutcome::Ended)
    }

    /// Add a manually recorded saving to the running total.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Validation` for a missing, non-numeric or
    /// non-positive amount, `PlanError::NotReady` without an active plan,
    /// or a store error.
    pub async fn record_saving(&self, amount: &str) -> Result<SavingRecord, PlanError> {
        let amount = parse_positive("amount", amount)?;
        let mut state = self.repo.load().await?;
        if !state.is_active {
            warn!("Saving recorded with no active plan");
            return Err(PlanError::NotReady);
        }

        let total = state
            .manual_savings()
            .checked_add(amount)
            .ok_or(PlanError::overflow("manual_savings"))?;
        state.manual_savings = Some(total);
        self.repo.save(&state).await?;

        info!(amount = %amount, manual_savings = %total, "Saving recorded");
        Ok(SavingRecord {
            added: amount,
            total,
        })
    }

    /// Progress of the active plan.
    ///
    /// Never fails: collaborator errors and a corrupt allocation plan are
    /// logged and reported as [`ProgressOutcome::Failed`].
    pub async fn check_progress(&self, now: DateTime<Utc>) -> ProgressOutcome {
        match self.progress(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Failed to check progress");
                ProgressOutcome::Failed {
                    message: PROGRESS_FAILED_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn progress(&self, now: DateTime<Utc>) -> Result<ProgressOutcome, PlanError> {
        let state = self.repo.load().await?;
        let started_at = match state.started_at {
            Some(started_at) if state.is_active => started_at,
            _ => return Ok(ProgressOutcome::NotStarted),
        };
        let tz = self.options.time_zone;

        let elapsed = ElapsedTime::from_days(elapsed_days(started_at, now, tz));
        let figures = state.monthly_figures();
        let manual_savings = state.manual_savings();
        let target_amount = state.target_amount.unwrap_or_default();
        let allowed_expense_so_far = figures
            .max_expense_per_month
            .checked_mul(elapsed.as_months())
            .ok_or(PlanError::overflow("allowed_expense_so_far"))?;
        let allocations = state.allocations()?;

        let spent_since_start = self.expenses.total_expense_since(started_at).await?;
        let window_start = spending_window_start(started_at, now, tz);
        let categories: Vec<CategoryProgress> = self
            .expenses
            .expenses_by_category_in_range(window_start, now)
            .await?
            .into_iter()
            .map(|row| CategoryProgress {
                planned: allocations.get(&row.category).unwrap_or_default(),
                category: row.category,
                spent: row.total,
            })
            .collect();
        let any_over = categories.iter().any(|c| c.over_by().is_some());

        Ok(ProgressOutcome::Report(ProgressReport {
            target_amount,
            duration_months: state.duration_months.unwrap_or_default(),
            started_at,
            started_on: local_date(started_at, tz),
            elapsed,
            figures,
            manual_savings,
            remaining_target: target_amount.saturating_sub(manual_savings).max(Decimal::ZERO),
            spent_since_start,
            allowed_expense_so_far,
            categories,
            any_over,
        }))
    }

    /// Re-balance the active plan against the time and savings left and
    /// this month's spending.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NoPriorPlan` without a started plan, or a store,
    /// query or allocation encoding error.
    pub async fn recalculate(&self, now: DateTime<Utc>) -> Result<RebalanceReport, PlanError> {
        let state = self.repo.load().await?;
        self.recalculate_from(&state, now).await
    }

    async fn recalculate_from(
        &self,
        state: &PlanState,
        now: DateTime<Utc>,
    ) -> Result<RebalanceReport, PlanError> {
        let (Some((target, duration, income)), Some(started_at), true) =
            (state.inputs(), state.started_at, state.is_active)
        else {
            warn!("Recalculate requested without a started plan");
            return Err(PlanError::NoPriorPlan);
        };
        let tz = self.options.time_zone;
        let manual_savings = state.manual_savings();

        let elapsed = ElapsedTime::from_days(elapsed_days(started_at, now, tz));
        let remaining = RemainingTime::after(duration, &elapsed);
        let remaining_target = target.saturating_sub(manual_savings).max(Decimal::ZERO);
        let saving_per_month = if remaining.total_months > Decimal::ZERO {
            remaining_target
                .checked_div(remaining.total_months)
                .ok_or(PlanError::overflow("saving_per_month"))?
        } else {
            remaining_target
        };
        let figures = MonthlyFigures::from_saving(saving_per_month, income)?;
        if !figures.is_feasible() {
            warn!(
                max_expense_per_month = %figures.max_expense_per_month,
                "Recalculated plan exceeds income"
            );
        }

        let history = self.history(now).await?;
        let base = CategoryAllocations::proportional(&history, figures.max_expense_per_month)?;

        let mut updated = PlanState {
            saving_per_month: Some(figures.saving_per_month),
            max_expense_per_month: Some(figures.max_expense_per_month),
            ..state.clone()
        };

        let rebalance = if base.is_empty() {
            // Keeps the previous allocation plan.
            None
        } else {
            let spent: HashMap<String, Decimal> = self
                .expenses
                .expenses_by_category_in_range(spending_window_start(started_at, now, tz), now)
                .await?
                .into_iter()
                .map(|row| (row.category, row.total))
                .collect();
            let rebalance = Rebalance::compute(&in_history_order(&history, &base), &spent)?;
            updated.category_allocation_plan = Some(rebalance.allocations().encode()?);
            Some(rebalance)
        };

        self.repo.save(&updated).await?;

        info!(
            remaining_target = %remaining_target,
            remaining_months = %remaining.total_months,
            saving_per_month = %figures.saving_per_month,
            max_expense_per_month = %figures.max_expense_per_month,
            adjusted = rebalance.as_ref().is_some_and(Rebalance::was_adjusted),
            "Plan recalculated"
        );

        Ok(RebalanceReport {
            target_amount: target,
            manual_savings,
            remaining_target,
            remaining,
            figures,
            rebalance,
        })
    }

    async fn history(&self, now: DateTime<Utc>) -> Result<Vec<CategoryExpense>, PlanError> {
        let since = months_before(now, self.options.history_months, self.options.time_zone);
        self.expenses.expenses_by_category_since(since).await
    }
}

/// Base allocations ordered as their categories first appear in `history`.
fn in_history_order(
    history: &[CategoryExpense],
    base: &CategoryAllocations,
) -> Vec<(String, Decimal)> {
    let mut seen = HashSet::new();
    history
        .iter()
        .filter(|row| seen.insert(row.category.as_str()))
        .filter_map(|row| {
            base.get(&row.category)
                .map(|amount| (row.category.clone(), amount))
        })
        .collect()
}
