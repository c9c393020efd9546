//! Per-category spending allocation and its persisted text form.
//!
//! The persisted form is `name=amount;` repeated for every category, e.g.
//! `Food=3000000;Transport=1000000;`. Category names therefore must not
//! contain `=` or `;`; that is enforced when encoding rather than escaped.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PlanError;
use super::types::CategoryExpense;

const ENTRY_SEPARATOR: char = ';';
const PAIR_SEPARATOR: char = '=';

/// Monthly spending cap per category, keyed by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryAllocations(BTreeMap<String, Decimal>);

impl CategoryAllocations {
    /// Creates an empty allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `budget` across categories in proportion to their historical spend.
    ///
    /// `allocation[c] = (spent[c] / sum(spent)) * budget`. Returns an empty
    /// allocation when there are no rows or they sum to zero or less.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Overflow` if a total or share is out of range.
    pub fn proportional(history: &[CategoryExpense], budget: Decimal) -> Result<Self, PlanError> {
        let total = history
            .iter()
            .try_fold(Decimal::ZERO, |acc, row| acc.checked_add(row.total))
            .ok_or(PlanError::overflow("history_total"))?;
        let mut allocations = Self::new();
        if total <= Decimal::ZERO {
            return Ok(allocations);
        }

        for row in history {
            let share = row
                .total
                .checked_div(total)
                .and_then(|ratio| ratio.checked_mul(budget))
                .ok_or(PlanError::overflow("category_allocation"))?;
            let amount = allocations.0.entry(row.category.clone()).or_default();
            *amount = amount
                .checked_add(share)
                .ok_or(PlanError::overflow("category_allocation"))?;
        }
        Ok(allocations)
    }

    /// Sets the allocation of one category.
    pub fn insert(&mut self, category: impl Into<String>, amount: Decimal) {
        self.0.insert(category.into(), amount);
    }

    /// Allocation of a category, if it is part of the plan.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<Decimal> {
        self.0.get(category).copied()
    }

    /// Iterates categories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no category is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all allocations.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0
            .values()
            .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(*amount))
    }

    /// Encodes the allocation as `name=amount;name=amount;`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidCategoryName` for an empty name or one
    /// containing `=` or `;`.
    pub fn encode(&self) -> Result<String, PlanError> {
        let mut out = String::new();
        for (name, amount) in &self.0 {
            if name.is_empty() || name.contains([PAIR_SEPARATOR, ENTRY_SEPARATOR]) {
                return Err(PlanError::InvalidCategoryName(name.clone()));
            }
            out.push_str(name);
            out.push(PAIR_SEPARATOR);
            out.push_str(&amount.normalize().to_string());
            out.push(ENTRY_SEPARATOR);
        }
        Ok(out)
    }

    /// Parses the encoded form: split on `;`, then on the first `=`.
    ///
    /// Empty segments (such as the one after a trailing `;`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::MalformedAllocation` for a segment without `=`,
    /// with an empty name, or with an amount that is not a number.
    pub fn decode(encoded: &str) -> Result<Self, PlanError> {
        let mut allocations = Self::new();
        for segment in encoded.split(ENTRY_SEPARATOR) {
            if segment.is_empty() {
                continue;
            }
            let (name, amount) = segment
                .split_once(PAIR_SEPARATOR)
                .ok_or_else(|| PlanError::MalformedAllocation(segment.to_string()))?;
            if name.is_empty() {
                return Err(PlanError::MalformedAllocation(segment.to_string()));
            }
            let amount = Decimal::from_str(amount.trim())
                .map_err(|_| PlanError::MalformedAllocation(segment.to_string()))?;
            allocations.insert(name, amount);
        }
        Ok(allocations)
    }
}

impl FromIterator<(String, Decimal)> for CategoryAllocations {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn rows(data: &[(&str, Decimal)]) -> Vec<CategoryExpense> {
        data.iter()
            .map(|(name, total)| CategoryExpense::new(*name, *total))
            .collect()
    }

    #[test]
    fn test_proportional_exact_split() {
        let history = rows(&[("Food", dec!(3000000)), ("Transport", dec!(1000000))]);
        let allocations = CategoryAllocations::proportional(&history, dec!(4000000)).unwrap();

        assert_eq!(allocations.get("Food"), Some(dec!(3000000)));
        assert_eq!(allocations.get("Transport"), Some(dec!(1000000)));
        assert_eq!(allocations.total(), dec!(4000000));
    }

    #[test]
    fn test_proportional_thirds_within_tolerance() {
        let history = rows(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))]);
        let allocations = CategoryAllocations::proportional(&history, dec!(100)).unwrap();

        assert_eq!(allocations.len(), 3);
        assert!((allocations.total() - dec!(100)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_proportional_empty_history() {
        let allocations = CategoryAllocations::proportional(&[], dec!(4000000)).unwrap();
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_proportional_zero_history() {
        let history = rows(&[("Food", dec!(0)), ("Transport", dec!(0))]);
        let allocations = CategoryAllocations::proportional(&history, dec!(4000000)).unwrap();
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_proportional_merges_duplicate_rows() {
        let history = rows(&[("Food", dec!(1)), ("Food", dec!(1)), ("Home", dec!(2))]);
        let allocations = CategoryAllocations::proportional(&history, dec!(400)).unwrap();
        assert_eq!(allocations.get("Food"), Some(dec!(200)));
        assert_eq!(allocations.get("Home"), Some(dec!(200)));
    }

    #[test]
    fn test_proportional_reports_overflow() {
        let history = rows(&[("Food", Decimal::MAX), ("Home", Decimal::MAX)]);
        let err = CategoryAllocations::proportional(&history, dec!(100)).unwrap_err();
        assert!(matches!(err, PlanError::Overflow { quantity: "history_total" }));
    }

    #[test]
    fn test_encode_format() {
        let mut allocations = CategoryAllocations::new();
        allocations.insert("Food", dec!(3000000.00));
        allocations.insert("Transport", dec!(1000000));

        assert_eq!(
            allocations.encode().unwrap(),
            "Food=3000000;Transport=1000000;"
        );
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(CategoryAllocations::new().encode().unwrap(), "");
    }

    #[rstest]
    #[case("Fo=od")]
    #[case("Fo;od")]
    #[case("")]
    fn test_encode_rejects_reserved_names(#[case] name: &str) {
        let mut allocations = CategoryAllocations::new();
        allocations.insert(name, dec!(1));
        assert!(matches!(
            allocations.encode(),
            Err(PlanError::InvalidCategoryName(_))
        ));
    }

    #[test]
    fn test_decode_without_trailing_separator() {
        let allocations = CategoryAllocations::decode("Food=1.5;Home=2").unwrap();
        assert_eq!(allocations.get("Food"), Some(dec!(1.5)));
        assert_eq!(allocations.get("Home"), Some(dec!(2)));
    }

    #[test]
    fn test_decode_empty_string() {
        assert!(CategoryAllocations::decode("").unwrap().is_empty());
    }

    #[rstest]
    #[case("Food")]
    #[case("Food=abc;")]
    #[case("=12;")]
    #[case("Food=1;Home=;")]
    fn test_decode_rejects_malformed(#[case] encoded: &str) {
        assert!(matches!(
            CategoryAllocations::decode(encoded),
            Err(PlanError::MalformedAllocation(_))
        ));
    }

    #[test]
    fn test_decode_negative_amounts() {
        let allocations = CategoryAllocations::decode("Food=-250.5;").unwrap();
        assert_eq!(allocations.get("Food"), Some(dec!(-250.5)));
    }

    #[test]
    fn test_round_trip() {
        let allocations: CategoryAllocations = [
            ("Food".to_string(), dec!(2000000)),
            ("Home & Garden".to_string(), dec!(333333.33333333333333)),
            ("Transport".to_string(), dec!(-12.5)),
        ]
        .into_iter()
        .collect();

        let decoded = CategoryAllocations::decode(&allocations.encode().unwrap()).unwrap();
        assert_eq!(decoded, allocations);
    }
}
