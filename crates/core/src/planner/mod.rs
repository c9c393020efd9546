//! Savings plan calculation, progress tracking and category re-balancing.

pub mod allocation;
pub mod calendar;
pub mod error;
pub mod rebalance;
pub mod report;
pub mod service;
pub mod types;
pub mod worker;

#[cfg(test)]
mod testing;


pub use allocation::CategoryAllocations;
pub use calendar::{ElapsedTime, RemainingTime};
pub use error::PlanError;
pub use rebalance::{CategoryRebalance, Rebalance};
pub use report::{Render, plan_started};
pub use service::{BudgetPlanner, ExpenseSource, PlanRepository, PlannerOptions};
pub use types::{
    CalculateOutcome, CategoryExpense, CategoryProgress, EndOutcome, MonthlyFigures, Plan,
    PlanInput, PlanState, ProgressOutcome, ProgressReport, RebalanceReport, SavingRecord,
};
pub use worker::{PlannerHandle, PlannerWorker};
