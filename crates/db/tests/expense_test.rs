//! Integration tests for the expense repository.

use chrono::{DateTime, TimeZone, Utc};
use mymoney_core::planner::{CategoryExpense, ExpenseSource};
use mymoney_db::ExpenseRepository;
use mymoney_db::migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Fresh in-memory database with the schema applied.
async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    db
}

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
}

async fn seeded() -> ExpenseRepository {
    let repo = ExpenseRepository::new(setup().await);
    let food = repo.create_category("Food").await.expect("Failed to create category");
    let transport = repo
        .create_category("Transport")
        .await
        .expect("Failed to create category");
    let home = repo.create_category("Home").await.expect("Failed to create category");

    for (category, amount, when) in [
        (food.id, dec!(1000000), at(8, 15)),
        (food.id, dec!(2000000), at(9, 20)),
        (transport.id, dec!(1000000), at(9, 21)),
        (home.id, dec!(500000), at(10, 2)),
        (food.id, dec!(300000), at(10, 5)),
    ] {
        repo.record_expense(category, amount, when, None)
            .await
            .expect("Failed to record expense");
    }
    repo
}

#[tokio::test]
async fn test_expenses_by_category_since() {
    let repo = seeded().await;

    let rows = repo
        .expenses_by_category_since(at(9, 1))
        .await
        .expect("Failed to aggregate");

    assert_eq!(
        rows,
        vec![
            CategoryExpense::new("Food", dec!(2300000)),
            CategoryExpense::new("Transport", dec!(1000000)),
            CategoryExpense::new("Home", dec!(500000)),
        ]
    );
}

#[tokio::test]
async fn test_expenses_by_category_in_range() {
    let repo = seeded().await;

    let rows = repo
        .expenses_by_category_in_range(at(10, 1), at(10, 5))
        .await
        .expect("Failed to aggregate");

    // The range end is inclusive.
    assert_eq!(
        rows,
        vec![
            CategoryExpense::new("Home", dec!(500000)),
            CategoryExpense::new("Food", dec!(300000)),
        ]
    );
}

#[tokio::test]
async fn test_empty_window() {
    let repo = seeded().await;
    let rows = repo
        .expenses_by_category_since(at(12, 1))
        .await
        .expect("Failed to aggregate");
    assert!(rows.is_empty());
    assert_eq!(
        repo.total_expense_since(at(12, 1)).await.expect("Failed to sum"),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_total_expense_since() {
    let repo = seeded().await;
    let total = repo
        .total_expense_since(at(9, 20))
        .await
        .expect("Failed to sum");
    assert_eq!(total, dec!(3800000));
}

#[tokio::test]
async fn test_find_or_create_category() {
    let repo = ExpenseRepository::new(setup().await);

    let first = repo
        .find_or_create_category("Food")
        .await
        .expect("Failed to create category");
    let second = repo
        .find_or_create_category("Food")
        .await
        .expect("Failed to find category");

    assert_eq!(first.id, second.id);
    assert_eq!(repo.list_categories().await.expect("Failed to list").len(), 1);
}

#[tokio::test]
async fn test_duplicate_category_rejected() {
    let repo = ExpenseRepository::new(setup().await);
    repo.create_category("Food").await.expect("Failed to create category");
    assert!(repo.create_category("Food").await.is_err());
}
