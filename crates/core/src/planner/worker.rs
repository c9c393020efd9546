//! Serial action worker.
//!
//! A single tokio task owns the planner. Every user action is sent to it as
//! one job and the caller awaits the reply, so actions run one at a time in
//! arrival order. Each action runs in its own task, so a panicking action
//! fails only its own caller. The worker exits once every handle has been
//! dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::error::PlanError;
use super::service::{BudgetPlanner, ExpenseSource, PlanRepository, PlannerOptions};
use super::types::{
    CalculateOutcome, EndOutcome, Plan, PlanInput, PlanState, ProgressOutcome, SavingRecord,
};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One queued unit of work.
type PlannerAction<R, E> = Box<dyn FnOnce(Arc<BudgetPlanner<R, E>>) -> BoxFuture + Send>;

/// Spawns the worker task.
pub struct PlannerWorker;

impl PlannerWorker {
    /// Move `planner` into a new worker task and return a handle to it.
    ///
    /// `capacity` bounds the number of queued actions. Must be called from
    /// within a tokio runtime.
    pub fn spawn<R, E>(planner: BudgetPlanner<R, E>, capacity: usize) -> PlannerHandle<R, E>
    where
        R: PlanRepository + 'static,
        E: ExpenseSource + 'static,
    {
        let options = *planner.options();
        let (tx, mut rx) = mpsc::channel::<PlannerAction<R, E>>(capacity.max(1));
        let planner = Arc::new(planner);

        tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                if let Err(e) = tokio::spawn(action(Arc::clone(&planner))).await {
                    error!(error = %e, "Planner action aborted");
                }
            }
            debug!("Planner worker stopped");
        });

        PlannerHandle { tx, options }
    }
}

/// Cloneable handle used to enqueue actions.
pub struct PlannerHandle<R: PlanRepository, E: ExpenseSource> {
    tx: mpsc::Sender<PlannerAction<R, E>>,
    options: PlannerOptions,
}

impl<R: PlanRepository, E: ExpenseSource> Clone for PlannerHandle<R, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            options: self.options,
        }
    }
}

impl<R, E> PlannerHandle<R, E>
where
    R: PlanRepository + 'static,
    E: ExpenseSource + 'static,
{
    /// Settings of the planner behind this handle.
    #[must_use]
    pub const fn options(&self) -> &PlannerOptions {
        &self.options
    }

    async fn run<T, F, Fut>(&self, f: F) -> Result<T, PlanError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<BudgetPlanner<R, E>>) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let action: PlannerAction<R, E> = Box::new(move |planner| {
            Box::pin(async move {
                // The caller may have gone away; the action still ran.
                let _ = reply_tx.send(f(planner).await);
            })
        });

        self.tx
            .send(action)
            .await
            .map_err(|_| PlanError::WorkerStopped)?;
        // A dropped reply means the action never finished.
        reply_rx.await.map_err(|_| PlanError::ActionAborted)
    }

    /// The "calculate" trigger. See [`BudgetPlanner::calculate_or_recalculate`].
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or `PlanError::WorkerStopped`.
    pub async fn calculate(
        &self,
        input: PlanInput,
        now: DateTime<Utc>,
    ) -> Result<CalculateOutcome, PlanError> {
        self.run(move |planner| async move { planner.calculate_or_recalculate(&input, now).await })
            .await?
    }

    /// See [`BudgetPlanner::start`].
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or `PlanError::WorkerStopped`.
    pub async fn start(&self, now: DateTime<Utc>) -> Result<Plan, PlanError> {
        self.run(move |planner| async move { planner.start(now).await })
            .await?
    }

    /// See [`BudgetPlanner::end`].
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or `PlanError::WorkerStopped`.
    pub async fn end(&self) -> Result<EndOutcome, PlanError> {
        self.run(|planner| async move { planner.end().await })
            .await?
    }

    /// See [`BudgetPlanner::record_saving`].
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or `PlanError::WorkerStopped`.
    pub async fn record_saving(&self, amount: String) -> Result<SavingRecord, PlanError> {
        self.run(move |planner| async move { planner.record_saving(&amount).await })
            .await?
    }

    /// See [`BudgetPlanner::check_progress`].
    ///
    /// # Errors
    ///
    /// Returns `PlanError::WorkerStopped` if the worker is gone.
    pub async fn check_progress(&self, now: DateTime<Utc>) -> Result<ProgressOutcome, PlanError> {
        self.run(move |planner| async move { planner.check_progress(now).await })
            .await
    }

    /// See [`BudgetPlanner::current_state`].
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or `PlanError::WorkerStopped`.
    pub async fn current_state(&self) -> Result<PlanState, PlanError> {
        self.run(|planner| async move { planner.current_state().await })
            .await?
    }
}
