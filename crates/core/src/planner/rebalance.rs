//! Re-balancing of category allocations against current spending.
//!
//! Categories whose current spend exceeds their proportional base are "over";
//! their combined excess is taken out of the remaining categories, each
//! giving up a share proportional to its own base:
//!
//! ```text
//! allocated[c] = max(0, base[c] - base[c] * (total_exceeded / total_adjustable))
//! ```
//!
//! Over categories keep their base.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::CategoryAllocations;
use super::error::PlanError;

/// New allocation of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRebalance {
    /// Category name.
    pub category: String,
    /// Proportional allocation before re-balancing.
    pub base: Decimal,
    /// Spent in the current window.
    pub spent: Decimal,
    /// Allocation after re-balancing.
    pub allocated: Decimal,
    /// Whether spend exceeded the base.
    pub exceeded_base: bool,
}

impl CategoryRebalance {
    /// Amount spent beyond the new allocation, if any.
    #[must_use]
    pub fn over_by(&self) -> Option<Decimal> {
        (self.spent > self.allocated).then(|| self.spent.saturating_sub(self.allocated))
    }
}

/// Outcome of a re-balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebalance {
    /// One line per category, in the order of the base allocation input.
    pub lines: Vec<CategoryRebalance>,
    /// Sum of `spent - base` over the categories that exceeded their base.
    pub total_exceeded: Decimal,
    /// Sum of `base` over the categories that did not.
    pub total_adjustable: Decimal,
}

impl Rebalance {
    /// Re-balances `base` (category, amount pairs) against `spent`.
    ///
    /// Categories absent from `spent` have spent nothing.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Overflow` if an excess, a total or a reduction is
    /// out of range.
    pub fn compute(
        base: &[(String, Decimal)],
        spent: &HashMap<String, Decimal>,
    ) -> Result<Self, PlanError> {
        let overflow = || PlanError::overflow("rebalance");
        let mut total_exceeded = Decimal::ZERO;
        let mut total_adjustable = Decimal::ZERO;
        let mut lines = Vec::with_capacity(base.len());

        for (category, base) in base {
            let spent = spent.get(category).copied().unwrap_or_default();
            let exceeded_base = spent > *base;
            if exceeded_base {
                let excess = spent.checked_sub(*base).ok_or_else(overflow)?;
                total_exceeded = total_exceeded.checked_add(excess).ok_or_else(overflow)?;
            } else {
                total_adjustable = total_adjustable.checked_add(*base).ok_or_else(overflow)?;
            }
            lines.push(CategoryRebalance {
                category: category.clone(),
                base: *base,
                spent,
                allocated: *base,
                exceeded_base,
            });
        }

        if total_exceeded > Decimal::ZERO && total_adjustable > Decimal::ZERO {
            let ratio = total_exceeded
                .checked_div(total_adjustable)
                .ok_or_else(overflow)?;
            for line in lines.iter_mut().filter(|line| !line.exceeded_base) {
                let cut = line.base.checked_mul(ratio).ok_or_else(overflow)?;
                line.allocated = line
                    .base
                    .checked_sub(cut)
                    .ok_or_else(overflow)?
                    .max(Decimal::ZERO);
            }
        }

        Ok(Self {
            lines,
            total_exceeded,
            total_adjustable,
        })
    }

    /// True if any allocation changed.
    #[must_use]
    pub fn was_adjusted(&self) -> bool {
        self.lines.iter().any(|line| line.allocated != line.base)
    }

    /// True if any category exceeded its base.
    #[must_use]
    pub fn any_over(&self) -> bool {
        self.lines.iter().any(|line| line.exceeded_base)
    }

    /// Sum of the new allocations.
    #[must_use]
    pub fn total_allocated(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.allocated))
    }

    /// The new allocations keyed by category.
    #[must_use]
    pub fn allocations(&self) -> CategoryAllocations {
        self.lines
            .iter()
            .map(|line| (line.category.clone(), line.allocated))
            .collect()
    }
}
