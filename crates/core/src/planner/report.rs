//! Human-readable renderings of planner results.

use std::fmt::Write;

use chrono::NaiveDate;
use mymoney_shared::Money;
use rust_decimal::Decimal;

use super::types::{
    CalculateOutcome, EndOutcome, Plan, ProgressOutcome, ProgressReport, RebalanceReport,
    SavingRecord,
};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Renders a result as the status text shown to the user.
pub trait Render {
    /// Render with amounts labelled by `currency`, e.g. `VND`.
    fn render(&self, currency: &str) -> String;
}

fn money(amount: Decimal, currency: &str) -> String {
    Money::new(amount).with_label(currency)
}

fn months(duration: Decimal) -> String {
    duration.normalize().to_string()
}

fn date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

impl Render for Plan {
    fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Target: {} in {} months",
            money(self.target_amount, currency),
            months(self.duration_months)
        );
        let _ = writeln!(out, "Monthly income: {}", money(self.monthly_income, currency));
        let _ = writeln!(
            out,
            "Save per month: {}",
            money(self.figures.saving_per_month, currency)
        );
        let _ = writeln!(
            out,
            "Max expense per month: {}",
            money(self.figures.max_expense_per_month, currency)
        );
        out.push('\n');

        if self.has_allocations() {
            out.push_str("Suggested monthly budget by category:\n");
            for (category, amount) in self.category_allocations.iter() {
                let _ = writeln!(out, " - {category}: <= {}", money(amount, currency));
            }
        } else {
            out.push_str("No spending history to allocate by category.\n");
        }
        out
    }
}

impl Render for ProgressReport {
    fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Target: {} | {} months",
            money(self.target_amount, currency),
            months(self.duration_months)
        );
        let _ = writeln!(out, "Started: {}", date(self.started_on));
        if self.elapsed.is_first_day() {
            out.push_str("Saving started today.\n");
        } else {
            out.push_str("Elapsed: ");
            if self.elapsed.months > 0 {
                let _ = write!(out, "{} months ", self.elapsed.months);
            }
            let _ = writeln!(out, "{} days", self.elapsed.remaining_days);
        }
        let _ = writeln!(
            out,
            "Saved so far: {} (remaining {})",
            money(self.manual_savings, currency),
            money(self.remaining_target, currency)
        );
        let _ = writeln!(
            out,
            "Spent since start: {} of {} allowed so far",
            money(self.spent_since_start, currency),
            money(self.allowed_expense_so_far, currency)
        );
        out.push('\n');

        if !self.categories.is_empty() {
            out.push_str("Spending by category this month:\n");
            for category in &self.categories {
                let _ = write!(
                    out,
                    " - {}: {} / {}",
                    category.category,
                    Money::new(category.spent),
                    money(category.planned, currency)
                );
                if let Some(over) = category.over_by() {
                    let _ = write!(out, " (over by {})", Money::new(over));
                }
                out.push('\n');
            }
        }

        if self.any_over {
            out.push_str("\nSome categories are over budget. Adjust your spending.\n");
        } else {
            out.push_str("\nSpending is within the plan. Keep it up!\n");
        }
        out
    }
}

impl Render for ProgressOutcome {
    fn render(&self, currency: &str) -> String {
        match self {
            Self::NotStarted => "You have not started saving yet.".to_string(),
            Self::Report(report) => report.render(currency),
            Self::Failed { message } => message.clone(),
        }
    }
}

impl Render for RebalanceReport {
    fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        out.push_str("Plan updated from progress:\n");
        let _ = writeln!(out, "Target: {}", money(self.target_amount, currency));
        let _ = writeln!(out, "Saved: {}", money(self.manual_savings, currency));
        out.push_str("Remaining: ");
        if self.remaining.months > 0 {
            let _ = write!(out, "{} months ", self.remaining.months);
        }
        let _ = writeln!(out, "{} days", self.remaining.days);
        let _ = writeln!(
            out,
            "New save per month: {}",
            money(self.figures.saving_per_month, currency)
        );
        let _ = writeln!(
            out,
            "New max expense per month: {}",
            money(self.figures.max_expense_per_month, currency)
        );
        out.push('\n');

        let Some(rebalance) = &self.rebalance else {
            out.push_str("No spending history to allocate by category.\n");
            return out;
        };

        out.push_str("New monthly budget by category (rebalanced):\n");
        for line in &rebalance.lines {
            let _ = write!(
                out,
                " - {}: <= {}",
                line.category,
                money(line.allocated, currency)
            );
            if let Some(over) = line.over_by() {
                let _ = write!(
                    out,
                    " (spent {}, over by {})",
                    Money::new(line.spent),
                    Money::new(over)
                );
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "\nTotal allocated: {} / {}",
            Money::new(rebalance.total_allocated()),
            money(self.figures.max_expense_per_month, currency)
        );
        out
    }
}

impl Render for CalculateOutcome {
    fn render(&self, currency: &str) -> String {
        match self {
            Self::Calculated(plan) => plan.render(currency),
            Self::Recalculated(report) => report.render(currency),
        }
    }
}

impl Render for EndOutcome {
    fn render(&self, _currency: &str) -> String {
        match self {
            Self::Ended => "Saving plan ended.".to_string(),
            Self::NothingToEnd => "There is no active saving plan to end.".to_string(),
        }
    }
}

impl Render for SavingRecord {
    fn render(&self, currency: &str) -> String {
        format!(
            "Added {}. Total saved: {}",
            money(self.added, currency),
            money(self.total, currency)
        )
    }
}

/// Status line after starting a plan.
#[must_use]
pub fn plan_started(started_on: NaiveDate) -> String {
    format!(
        "Saving started on {}. Record your actual savings to track progress.",
        date(started_on)
    )
}
