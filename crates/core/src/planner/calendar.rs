//! Calendar-day arithmetic for plan progress.
//!
//! Elapsed time is counted in whole local calendar days (both instants are
//! truncated to local midnight before subtracting) and converted to months
//! with a fixed 30-day month.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Days in a planning month.
pub const DAYS_PER_MONTH: i64 = 30;

/// Local calendar date of an instant.
#[must_use]
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Whole calendar days between `start` and `now` in `tz`, never negative.
#[must_use]
pub fn elapsed_days(start: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> i64 {
    let days = (local_date(now, tz) - local_date(start, tz)).num_days();
    days.max(0)
}

/// Local midnight of `date`, as a UTC instant.
///
/// Falls back to midnight UTC when local midnight does not exist (a DST gap).
#[must_use]
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// Start of the current local calendar month.
#[must_use]
pub fn month_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let today = local_date(now, tz);
    let first = today.with_day(1).unwrap_or(today);
    local_midnight(first, tz)
}

/// The instant `months` calendar months before `now`, in local time.
#[must_use]
pub fn months_before(now: DateTime<Utc>, months: u32, tz: Tz) -> DateTime<Utc> {
    now.with_timezone(&tz)
        .checked_sub_months(Months::new(months))
        .map_or_else(
            || now - Duration::days(DAYS_PER_MONTH * i64::from(months)),
            |dt| dt.with_timezone(&Utc),
        )
}

/// Start of the current-month spending window of a plan:
/// `max(start of this month, plan start)`.
#[must_use]
pub fn spending_window_start(
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    month_start(now, tz).max(started_at)
}

/// Time elapsed since a plan started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTime {
    /// Whole calendar days.
    pub days: i64,
    /// Whole 30-day months.
    pub months: i64,
    /// Days past the last whole month.
    pub remaining_days: i64,
}

impl ElapsedTime {
    /// Splits a day count into 30-day months and leftover days.
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        Self {
            days,
            months: days / DAYS_PER_MONTH,
            remaining_days: days % DAYS_PER_MONTH,
        }
    }

    /// True on the day the plan started.
    #[must_use]
    pub const fn is_first_day(&self) -> bool {
        self.days == 0
    }

    /// Elapsed time as a fractional number of months (`days / 30`).
    #[must_use]
    pub fn as_months(&self) -> Decimal {
        Decimal::from(self.days) / Decimal::from(DAYS_PER_MONTH)
    }
}

/// Time left in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingTime {
    /// `max(0, duration - elapsed months)`.
    pub total_months: Decimal,
    /// Whole months left.
    pub months: i64,
    /// Leftover fraction of a month, in days (half away from zero).
    pub days: i64,
}

impl RemainingTime {
    /// Remaining time of a `duration_months` plan after `elapsed`.
    #[must_use]
    pub fn after(duration_months: Decimal, elapsed: &ElapsedTime) -> Self {
        let total_months = (duration_months - elapsed.as_months()).max(Decimal::ZERO);
        let whole = total_months.floor();
        let days = ((total_months - whole) * Decimal::from(DAYS_PER_MONTH))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Self {
            total_months,
            months: whole.to_i64().unwrap_or(i64::MAX),
            days: days.to_i64().unwrap_or_default(),
        }
    }

    /// True once the whole duration has passed.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.total_months.is_zero()
    }
}
