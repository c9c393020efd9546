//! In-memory collaborators for planner tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::error::PlanError;
use super::service::{ExpenseSource, PlanRepository};
use super::types::{CategoryExpense, PlanState};

/// Noon UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

#[derive(Default)]
pub struct InMemoryPlanStore {
    state: Mutex<PlanState>,
    saves: AtomicUsize,
    clears: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryPlanStore {
    pub fn snapshot(&self) -> PlanState {
        self.state.lock().unwrap().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut PlanState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), PlanError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlanError::repository("store is read-only"));
        }
        Ok(())
    }
}

impl PlanRepository for InMemoryPlanStore {
    async fn load(&self) -> Result<PlanState, PlanError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &PlanState) -> Result<(), PlanError> {
        self.check_writable()?;
        *self.state.lock().unwrap() = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PlanError> {
        self.check_writable()?;
        *self.state.lock().unwrap() = PlanState::default();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryExpenses {
    rows: Mutex<Vec<(String, Decimal, DateTime<Utc>)>>,
    queries: AtomicUsize,
    fail: AtomicBool,
}

impl InMemoryExpenses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, category: &str, amount: Decimal, occurred_at: DateTime<Utc>) {
        self.rows
            .lock()
            .unwrap()
            .push((category.to_string(), amount, occurred_at));
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn grouped(
        &self,
        keep: impl Fn(DateTime<Utc>) -> bool,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlanError::repository("expense query failed"));
        }

        let mut totals: HashMap<String, Decimal> = HashMap::new();
        for (category, amount, occurred_at) in self.rows.lock().unwrap().iter() {
            if keep(*occurred_at) {
                *totals.entry(category.clone()).or_default() += *amount;
            }
        }

        let mut rows: Vec<CategoryExpense> = totals
            .into_iter()
            .filter(|(_, total)| *total > Decimal::ZERO)
            .map(|(category, total)| CategoryExpense::new(category, total))
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        Ok(rows)
    }
}

impl ExpenseSource for InMemoryExpenses {
    async fn expenses_by_category_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        self.grouped(|t| t >= start)
    }

    async fn expenses_by_category_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        self.grouped(|t| t >= start && t <= end)
    }

    async fn total_expense_since(&self, start: DateTime<Utc>) -> Result<Decimal, PlanError> {
        Ok(self
            .grouped(|t| t >= start)?
            .iter()
            .map(|row| row.total)
            .sum())
    }
}
