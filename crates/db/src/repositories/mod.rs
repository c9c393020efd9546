//! Repository abstractions for data access.
//!
//! Repositories implement the planner's collaborator traits on top of
//! `SeaORM`, hiding the database from the rest of the application.

pub mod expense;
pub mod plan_state;

pub use expense::ExpenseRepository;
pub use plan_state::PlanStateRepository;
