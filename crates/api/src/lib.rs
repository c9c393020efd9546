//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for the planner triggers
//! - Mapping of planner errors to HTTP responses

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use mymoney_core::planner::{BudgetPlanner, PlannerHandle, PlannerOptions, PlannerWorker};
use mymoney_db::{ExpenseRepository, PlanStateRepository};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Queued actions the planner worker accepts before callers wait.
const PLANNER_QUEUE_CAPACITY: usize = 64;

/// The planner worker handle used by the routes.
pub type Planner = PlannerHandle<PlanStateRepository, ExpenseRepository>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the planner worker.
    pub planner: Planner,
    /// Label appended to rendered amounts.
    pub currency_label: Arc<str>,
}

impl AppState {
    /// Builds the repositories on `db` and spawns the planner worker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(db: DatabaseConnection, options: PlannerOptions, currency_label: &str) -> Self {
        let planner = BudgetPlanner::new(
            Arc::new(PlanStateRepository::new(db.clone())),
            Arc::new(ExpenseRepository::new(db)),
            options,
        );
        Self {
            planner: PlannerWorker::spawn(planner, PLANNER_QUEUE_CAPACITY),
            currency_label: Arc::from(currency_label),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
