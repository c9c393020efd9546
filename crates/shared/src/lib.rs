//! Shared types, errors, and configuration for MyMoney.
//!
//! This crate provides common types used across all other crates:
//! - Money display with thousands grouping
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, PlannerConfig};
pub use error::{AppError, AppResult};
pub use types::Money;
