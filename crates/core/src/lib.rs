//! Core business logic for MyMoney.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and expense aggregation are reached through the collaborator
//! traits in [`planner::service`], implemented by the db crate.
//!
//! # Modules
//!
//! - `planner` - Savings plan calculation, progress tracking and re-balancing

pub mod planner;
