//! Expense repository: category/expense bookkeeping and the spend
//! aggregation the planner reads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mymoney_core::planner::{CategoryExpense, ExpenseSource, PlanError};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, Set,
};

use crate::entities::{categories, expenses};

/// Repository for categories and expenses.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Create a new expense repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the insert fails.
    pub async fn create_category(&self, name: &str) -> Result<categories::Model, DbErr> {
        categories::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    /// Find a category by name, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn find_or_create_category(&self, name: &str) -> Result<categories::Model, DbErr> {
        let existing = categories::Entity::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        match existing {
            Some(category) => Ok(category),
            None => self.create_category(name).await,
        }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<categories::Model>, DbErr> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await
    }

    /// Record an expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the category does not exist or the insert fails.
    pub async fn record_expense(
        &self,
        category_id: i32,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<expenses::Model, DbErr> {
        expenses::ActiveModel {
            category_id: Set(category_id),
            amount: Set(amount),
            occurred_at: Set(occurred_at),
            note: Set(note),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    /// (category name, amount) of every expense matching `query`.
    async fn amounts(
        &self,
        query: Select<expenses::Entity>,
    ) -> Result<Vec<(String, Decimal)>, PlanError> {
        query
            .select_only()
            .column(categories::Column::Name)
            .column(expenses::Column::Amount)
            .join(JoinType::InnerJoin, expenses::Relation::Categories.def())
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| PlanError::repository(e.to_string()))
    }

    async fn by_category(
        &self,
        query: Select<expenses::Entity>,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        group_by_category(self.amounts(query).await?)
    }
}

/// Sums amounts per category. Keeps totals above zero, largest first.
///
/// # Errors
///
/// Returns `PlanError::Overflow` if a category total is out of range.
pub fn group_by_category(
    amounts: Vec<(String, Decimal)>,
) -> Result<Vec<CategoryExpense>, PlanError> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for (category, amount) in amounts {
        let total = totals.entry(category).or_default();
        *total = total
            .checked_add(amount)
            .ok_or(PlanError::overflow("category_total"))?;
    }

    let mut rows: Vec<CategoryExpense> = totals
        .into_iter()
        .filter(|(_, total)| *total > Decimal::ZERO)
        .map(|(category, total)| CategoryExpense::new(category, total))
        .collect();
    rows.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(rows)
}

impl ExpenseSource for ExpenseRepository {
    async fn expenses_by_category_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        self.by_category(expenses::Entity::find().filter(expenses::Column::OccurredAt.gte(start)))
            .await
    }

    async fn expenses_by_category_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryExpense>, PlanError> {
        self.by_category(
            expenses::Entity::find()
                .filter(expenses::Column::OccurredAt.gte(start))
                .filter(expenses::Column::OccurredAt.lte(end)),
        )
        .await
    }

    async fn total_expense_since(&self, start: DateTime<Utc>) -> Result<Decimal, PlanError> {
        let amounts: Vec<Decimal> = expenses::Entity::find()
            .filter(expenses::Column::OccurredAt.gte(start))
            .select_only()
            .column(expenses::Column::Amount)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| PlanError::repository(e.to_string()))?;
        amounts
            .into_iter()
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .ok_or(PlanError::overflow("total_expense"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_group_by_category_sums_and_orders() {
        let rows = group_by_category(vec![
            ("Home".to_string(), dec!(100)),
            ("Food".to_string(), dec!(200)),
            ("Home".to_string(), dec!(150)),
            ("Gifts".to_string(), dec!(50)),
        ])
        .unwrap();

        assert_eq!(
            rows,
            vec![
                CategoryExpense::new("Home", dec!(250)),
                CategoryExpense::new("Food", dec!(200)),
                CategoryExpense::new("Gifts", dec!(50)),
            ]
        );
    }

    #[test]
    fn test_group_by_category_drops_non_positive_totals() {
        let rows = group_by_category(vec![
            ("Refund".to_string(), dec!(100)),
            ("Refund".to_string(), dec!(-100)),
            ("Food".to_string(), dec!(1)),
        ])
        .unwrap();
        assert_eq!(rows, vec![CategoryExpense::new("Food", dec!(1))]);
    }

    #[test]
    fn test_group_by_category_reports_overflow() {
        let err = group_by_category(vec![
            ("Home".to_string(), Decimal::MAX),
            ("Home".to_string(), dec!(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, PlanError::Overflow { quantity: "category_total" }));
    }
}
