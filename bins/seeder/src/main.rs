//! Database seeder for MyMoney development.
//!
//! Creates a few expense categories and three months of sample spending so
//! the planner has history to allocate from.
//!
//! Usage: cargo run --bin seeder

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use mymoney_db::migration::{Migrator, MigratorTrait};
use mymoney_db::{ExpenseRepository, connect_with};
use mymoney_shared::AppConfig;

/// (category, amount) spent every ten days.
const SAMPLE_SPENDING: [(&str, Decimal); 4] = [
    ("Food", dec!(1000000)),
    ("Transport", dec!(300000)),
    ("Home", dec!(1500000)),
    ("Entertainment", dec!(200000)),
];

/// Days of history to generate.
const HISTORY_DAYS: i64 = 90;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    println!("Connecting to database...");
    let db = connect_with(&config.database).await?;
    Migrator::up(&db, None).await?;

    let repo = ExpenseRepository::new(db);

    println!("Seeding categories...");
    let mut categories = Vec::with_capacity(SAMPLE_SPENDING.len());
    for (name, amount) in SAMPLE_SPENDING {
        let category = repo.find_or_create_category(name).await?;
        categories.push((category.id, amount));
    }

    println!("Seeding expenses...");
    let now = Utc::now();
    let mut count = 0;
    for day in (0..HISTORY_DAYS).step_by(10) {
        let occurred_at = now - Duration::days(day);
        for (category_id, amount) in &categories {
            repo.record_expense(*category_id, *amount, occurred_at, Some("sample".to_string()))
                .await?;
            count += 1;
        }
    }
    println!("  {count} expenses recorded");

    println!("Seeding complete!");
    Ok(())
}
