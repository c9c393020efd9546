//! Planner data types.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::CategoryAllocations;
use super::calendar::{ElapsedTime, RemainingTime};
use super::error::PlanError;
use super::rebalance::Rebalance;

/// Raw user input for a plan calculation, as typed into the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanInput {
    /// Total amount to save.
    pub target_amount: String,
    /// Planning horizon in months (may be fractional).
    pub duration_months: String,
    /// Monthly income.
    pub monthly_income: String,
}

impl PlanInput {
    /// Creates an input from anything string-like.
    #[must_use]
    pub fn new(
        target_amount: impl Into<String>,
        duration_months: impl Into<String>,
        monthly_income: impl Into<String>,
    ) -> Self {
        Self {
            target_amount: target_amount.into(),
            duration_months: duration_months.into(),
            monthly_income: monthly_income.into(),
        }
    }

    /// Parses the three amounts.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Validation` naming the first field that is empty,
    /// not a number, or not strictly positive.
    pub fn parse(&self) -> Result<(Decimal, Decimal, Decimal), PlanError> {
        let target = parse_positive("target_amount", &self.target_amount)?;
        let duration = parse_positive("duration_months", &self.duration_months)?;
        let income = parse_positive("monthly_income", &self.monthly_income)?;
        Ok((target, duration, income))
    }
}

/// Parses a user-supplied decimal string that must be greater than zero.
///
/// # Errors
///
/// Returns `PlanError::Validation` if the string is empty, unparsable, or `<= 0`.
pub fn parse_positive(field: &'static str, raw: &str) -> Result<Decimal, PlanError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PlanError::validation(field, "is required"));
    }
    let value = Decimal::from_str(raw)
        .map_err(|_| PlanError::validation(field, format!("{raw:?} is not a number")))?;
    if value <= Decimal::ZERO {
        return Err(PlanError::validation(field, "must be greater than zero"));
    }
    Ok(value)
}

/// Derived monthly figures of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    /// Amount that must be put aside each month.
    pub saving_per_month: Decimal,
    /// Spending cap per month (`income - saving_per_month`).
    pub max_expense_per_month: Decimal,
}

impl MonthlyFigures {
    /// Computes `target / duration` and `income - target / duration`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Validation` when `duration` is zero, or
    /// `PlanError::Overflow` when either figure is out of range.
    pub fn compute(target: Decimal, duration: Decimal, income: Decimal) -> Result<Self, PlanError> {
        if duration.is_zero() {
            return Err(PlanError::validation(
                "duration_months",
                "must be greater than zero",
            ));
        }
        let saving_per_month = target
            .checked_div(duration)
            .ok_or(PlanError::overflow("saving_per_month"))?;
        Self::from_saving(saving_per_month, income)
    }

    /// Figures for a given required monthly saving.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Overflow` if the spending cap is out of range.
    pub fn from_saving(saving_per_month: Decimal, income: Decimal) -> Result<Self, PlanError> {
        let max_expense_per_month = income
            .checked_sub(saving_per_month)
            .ok_or(PlanError::overflow("max_expense_per_month"))?;
        Ok(Self {
            saving_per_month,
            max_expense_per_month,
        })
    }

    /// A plan is feasible while the spending cap is not negative.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.max_expense_per_month >= Decimal::ZERO
    }
}

/// One row of the expense aggregation: total spend of a category in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryExpense {
    /// Category name.
    pub category: String,
    /// Sum of expense amounts.
    pub total: Decimal,
}

impl CategoryExpense {
    /// Creates an aggregate row.
    #[must_use]
    pub fn new(category: impl Into<String>, total: Decimal) -> Self {
        Self {
            category: category.into(),
            total,
        }
    }
}

/// The persisted plan record. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanState {
    /// Whether a plan is running.
    pub is_active: bool,
    /// Total amount to save.
    pub target_amount: Option<Decimal>,
    /// Planning horizon in months.
    pub duration_months: Option<Decimal>,
    /// Monthly income.
    pub monthly_income: Option<Decimal>,
    /// Last computed monthly saving.
    pub saving_per_month: Option<Decimal>,
    /// Last computed monthly spending cap.
    pub max_expense_per_month: Option<Decimal>,
    /// Cumulative manually recorded savings.
    pub manual_savings: Option<Decimal>,
    /// When the plan was started.
    pub started_at: Option<DateTime<Utc>>,
    /// Encoded per-category allocation (`cat=amt;cat=amt;`).
    pub category_allocation_plan: Option<String>,
}

impl PlanState {
    /// Target, duration and income, if all three are set and positive.
    #[must_use]
    pub fn inputs(&self) -> Option<(Decimal, Decimal, Decimal)> {
        let positive = |v: Option<Decimal>| v.filter(|d| *d > Decimal::ZERO);
        Some((
            positive(self.target_amount)?,
            positive(self.duration_months)?,
            positive(self.monthly_income)?,
        ))
    }

    /// Persisted monthly figures, falling back to a fresh computation from
    /// target, duration and income for whichever figure is missing.
    #[must_use]
    pub fn monthly_figures(&self) -> MonthlyFigures {
        let target = self.target_amount.unwrap_or_default();
        let duration = self
            .duration_months
            .filter(|d| *d >= Decimal::ONE)
            .unwrap_or(Decimal::ONE);
        let income = self.monthly_income.unwrap_or_default();

        let saving_per_month = self
            .saving_per_month
            .unwrap_or_else(|| target / duration);
        let max_expense_per_month = self
            .max_expense_per_month
            .unwrap_or_else(|| income.saturating_sub(saving_per_month));

        MonthlyFigures {
            saving_per_month,
            max_expense_per_month,
        }
    }

    /// Manual savings, zero when unset.
    #[must_use]
    pub fn manual_savings(&self) -> Decimal {
        self.manual_savings.unwrap_or_default()
    }

    /// Decodes the stored allocation plan; an unset plan decodes as empty.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::MalformedAllocation` if the stored string is corrupt.
    pub fn allocations(&self) -> Result<CategoryAllocations, PlanError> {
        CategoryAllocations::decode(self.category_allocation_plan.as_deref().unwrap_or_default())
    }
}

/// A savings plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Total amount to save.
    pub target_amount: Decimal,
    /// Planning horizon in months.
    pub duration_months: Decimal,
    /// Monthly income.
    pub monthly_income: Decimal,
    /// Derived monthly figures.
    pub figures: MonthlyFigures,
    /// When the plan was started.
    pub started_at: Option<DateTime<Utc>>,
    /// Cumulative manually recorded savings.
    pub manual_savings: Decimal,
    /// Whether the plan is running.
    pub is_active: bool,
    /// Monthly spending cap per category.
    pub category_allocations: CategoryAllocations,
}

impl Plan {
    /// Rebuilds a plan from its persisted record.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NotReady` if target, duration or income is unset,
    /// or `PlanError::MalformedAllocation` for a corrupt allocation plan.
    pub fn from_state(state: &PlanState) -> Result<Self, PlanError> {
        let (target_amount, duration_months, monthly_income) =
            state.inputs().ok_or(PlanError::NotReady)?;
        Ok(Self {
            target_amount,
            duration_months,
            monthly_income,
            figures: state.monthly_figures(),
            started_at: state.started_at,
            manual_savings: state.manual_savings(),
            is_active: state.is_active,
            category_allocations: state.allocations()?,
        })
    }

    /// True when there was no spending history to allocate by.
    #[must_use]
    pub fn has_allocations(&self) -> bool {
        !self.category_allocations.is_empty()
    }
}

/// Result of the "calculate" trigger.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum CalculateOutcome {
    /// No plan was active: a fresh plan was calculated.
    Calculated(Plan),
    /// A plan was active: it was re-balanced against progress.
    Recalculated(RebalanceReport),
}

/// Result of the "end" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOutcome {
    /// The active plan was cleared.
    Ended,
    /// There was no active plan.
    NothingToEnd,
}

/// Result of recording a manual saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavingRecord {
    /// Amount just added.
    pub added: Decimal,
    /// Cumulative manual savings after the addition.
    pub total: Decimal,
}

/// Spending of one category compared with its allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    /// Category name.
    pub category: String,
    /// Spent in the current window.
    pub spent: Decimal,
    /// Planned allocation, zero for categories outside the plan.
    pub planned: Decimal,
}

impl CategoryProgress {
    /// Amount spent beyond the allocation, if any.
    #[must_use]
    pub fn over_by(&self) -> Option<Decimal> {
        (self.spent > self.planned).then(|| self.spent.saturating_sub(self.planned))
    }
}

/// Progress of an active plan.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    /// Total amount to save.
    pub target_amount: Decimal,
    /// Planning horizon in months.
    pub duration_months: Decimal,
    /// When the plan was started.
    pub started_at: DateTime<Utc>,
    /// Local calendar date the plan was started on.
    pub started_on: NaiveDate,
    /// Time since the start.
    pub elapsed: ElapsedTime,
    /// Current monthly figures.
    pub figures: MonthlyFigures,
    /// Manually recorded savings so far.
    pub manual_savings: Decimal,
    /// `max(0, target - manual_savings)`.
    pub remaining_target: Decimal,
    /// All expenses since the start.
    pub spent_since_start: Decimal,
    /// Spending the plan allows for the elapsed days.
    pub allowed_expense_so_far: Decimal,
    /// Per-category spend in the current month.
    pub categories: Vec<CategoryProgress>,
    /// Whether any category is over its allocation.
    pub any_over: bool,
}

/// Result of the "check" trigger.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum ProgressOutcome {
    /// No plan has been started.
    NotStarted,
    /// Progress of the active plan.
    Report(ProgressReport),
    /// Progress could not be computed.
    Failed {
        /// Generic message for the user.
        message: String,
    },
}

/// Result of re-balancing an active plan.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    /// Total amount to save.
    pub target_amount: Decimal,
    /// Manually recorded savings so far.
    pub manual_savings: Decimal,
    /// `max(0, target - manual_savings)`.
    pub remaining_target: Decimal,
    /// Time left in the plan.
    pub remaining: RemainingTime,
    /// New monthly figures.
    pub figures: MonthlyFigures,
    /// New allocation, `None` when there was no spending history.
    pub rebalance: Option<Rebalance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_figures_feasible() {
        let figures =
            MonthlyFigures::compute(dec!(12000000), dec!(12), dec!(5000000)).unwrap();
        assert_eq!(figures.saving_per_month, dec!(1000000));
        assert_eq!(figures.max_expense_per_month, dec!(4000000));
        assert!(figures.is_feasible());
    }

    #[test]
    fn test_monthly_figures_infeasible() {
        let figures = MonthlyFigures::compute(dec!(12000000), dec!(2), dec!(3000000)).unwrap();
        assert_eq!(figures.saving_per_month, dec!(6000000));
        assert_eq!(figures.max_expense_per_month, dec!(-3000000));
        assert!(!figures.is_feasible());
    }

    #[test]
    fn test_monthly_figures_zero_cap_is_feasible() {
        let figures = MonthlyFigures::compute(dec!(600), dec!(2), dec!(300)).unwrap();
        assert_eq!(figures.max_expense_per_month, dec!(0));
        assert!(figures.is_feasible());
    }

    #[test]
    fn test_monthly_figures_zero_duration() {
        let err = MonthlyFigures::compute(dec!(100), dec!(0), dec!(10)).unwrap_err();
        assert!(matches!(err, PlanError::Validation { field: "duration_months", .. }));
    }

    #[test]
    fn test_monthly_figures_overflowing_division() {
        // A tiny positive duration makes the quotient exceed the Decimal range.
        let err = MonthlyFigures::compute(Decimal::MAX, dec!(0.0000000001), dec!(10)).unwrap_err();
        assert!(matches!(err, PlanError::Overflow { quantity: "saving_per_month" }));
    }

    #[test]
    fn test_monthly_figures_overflowing_cap() {
        let err = MonthlyFigures::from_saving(Decimal::MAX, Decimal::MIN).unwrap_err();
        assert!(matches!(err, PlanError::Overflow { quantity: "max_expense_per_month" }));
    }

    #[rstest]
    #[case("", "target_amount")]
    #[case("   ", "target_amount")]
    #[case("abc", "target_amount")]
    #[case("0", "target_amount")]
    #[case("-5", "target_amount")]
    fn test_parse_rejects_bad_target(#[case] target: &str, #[case] field: &str) {
        let input = PlanInput::new(target, "12", "5000000");
        match input.parse() {
            Err(PlanError::Validation { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_names_duration_and_income() {
        let err = PlanInput::new("100", "x", "1").parse().unwrap_err();
        assert!(matches!(err, PlanError::Validation { field: "duration_months", .. }));

        let err = PlanInput::new("100", "1", "").parse().unwrap_err();
        assert!(matches!(err, PlanError::Validation { field: "monthly_income", .. }));
    }

    #[test]
    fn test_parse_accepts_fractional_duration() {
        let parsed = PlanInput::new(" 1000 ", "1.5", "2000").parse().unwrap();
        assert_eq!(parsed, (dec!(1000), dec!(1.5), dec!(2000)));
    }

    #[test]
    fn test_state_figures_prefer_persisted_values() {
        let state = PlanState {
            target_amount: Some(dec!(1200)),
            duration_months: Some(dec!(12)),
            monthly_income: Some(dec!(500)),
            saving_per_month: Some(dec!(150)),
            max_expense_per_month: Some(dec!(350)),
            ..PlanState::default()
        };
        let figures = state.monthly_figures();
        assert_eq!(figures.saving_per_month, dec!(150));
        assert_eq!(figures.max_expense_per_month, dec!(350));
    }

    #[test]
    fn test_state_figures_fall_back_to_division() {
        let state = PlanState {
            target_amount: Some(dec!(1200)),
            duration_months: Some(dec!(12)),
            monthly_income: Some(dec!(500)),
            ..PlanState::default()
        };
        let figures = state.monthly_figures();
        assert_eq!(figures.saving_per_month, dec!(100));
        assert_eq!(figures.max_expense_per_month, dec!(400));
    }

    #[test]
    fn test_plan_from_empty_state_not_ready() {
        assert!(matches!(
            Plan::from_state(&PlanState::default()),
            Err(PlanError::NotReady)
        ));
    }

    #[test]
    fn test_category_over_by() {
        let over = CategoryProgress {
            category: "Food".into(),
            spent: dec!(120),
            planned: dec!(100),
        };
        assert_eq!(over.over_by(), Some(dec!(20)));

        let within = CategoryProgress {
            category: "Food".into(),
            spent: dec!(100),
            planned: dec!(100),
        };
        assert_eq!(within.over_by(), None);
    }
}
