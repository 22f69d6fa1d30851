//! Integer minor-unit money and reporting periods.
//!
//! Every monetary amount in finrecon is a signed count of minor units
//! (cents). Decimal values only appear at the edges: parsing external
//! major-unit strings and applying configured ratios, both of which
//! round back to whole minor units immediately.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{FinreconError, Result, constants};

/// A signed amount of money in integer minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub fn checked_mul(self, factor: i64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Add, reporting overflow as an error.
    pub fn try_add(self, rhs: Self, context: &str) -> Result<Self> {
        self.checked_add(rhs).ok_or_else(|| FinreconError::Overflow {
            context: format!("{context}: {self} + {rhs}"),
        })
    }

    /// Subtract, reporting overflow as an error.
    pub fn try_sub(self, rhs: Self, context: &str) -> Result<Self> {
        self.checked_sub(rhs).ok_or_else(|| FinreconError::Overflow {
            context: format!("{context}: {self} - {rhs}"),
        })
    }

    /// Sum a sequence of amounts, reporting overflow as an error.
    pub fn try_sum(amounts: impl IntoIterator<Item = Self>, context: &str) -> Result<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.try_add(amount, context))
    }

    /// Reject a single amount larger than [`constants::MAX_LINE_AMOUNT_MINOR`]
    /// in absolute value.
    ///
    /// Within that bound the difference of any two amounts and the negation
    /// of any amount fit in `i64`.
    pub fn ensure_line_amount(self, what: &str) -> Result<Self> {
        if self.0.unsigned_abs() > constants::MAX_LINE_AMOUNT_MINOR.unsigned_abs() {
            return Err(FinreconError::validation(format!(
                "{what}: amount {self} exceeds the per-line limit of {}",
                Self(constants::MAX_LINE_AMOUNT_MINOR)
            )));
        }
        Ok(self)
    }

    /// Multiply by a count, reporting overflow as an error.
    pub fn try_mul(self, factor: i64, context: &str) -> Result<Self> {
        self.checked_mul(factor).ok_or_else(|| FinreconError::Overflow {
            context: format!("{context}: {self} x {factor}"),
        })
    }

    /// Absolute distance between two amounts, saturating at `i64::MAX`.
    #[must_use]
    pub fn distance(self, other: Self) -> i64 {
        self.0.abs_diff(other.0).try_into().unwrap_or(i64::MAX)
    }

    /// Apply a ratio and round half away from zero to whole minor units.
    pub fn apply_ratio(self, ratio: Decimal) -> Result<Self> {
        let scaled = Decimal::from(self.0)
            .checked_mul(ratio)
            .ok_or_else(|| FinreconError::Overflow {
                context: format!("{self} x {ratio}"),
            })?;
        Self::from_decimal_minor(scaled)
    }

    /// Apply a ratio and round towards zero to whole minor units.
    pub fn apply_ratio_floor(self, ratio: Decimal) -> Result<Self> {
        let scaled = Decimal::from(self.0)
            .checked_mul(ratio)
            .ok_or_else(|| FinreconError::Overflow {
                context: format!("{self} x {ratio}"),
            })?;
        scaled
            .trunc()
            .to_i64()
            .map(Self)
            .ok_or_else(|| FinreconError::Overflow {
                context: format!("{scaled} does not fit in minor units"),
            })
    }

    /// Convert a decimal count of minor units, rounding half away from zero.
    pub fn from_decimal_minor(value: Decimal) -> Result<Self> {
        value
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Self)
            .ok_or_else(|| FinreconError::Overflow {
                context: format!("{value} does not fit in minor units"),
            })
    }

    /// Parse a major-unit string such as `"1250.50"` or `"-3"`.
    ///
    /// More than [`constants::MONEY_SCALE`] significant fractional digits is
    /// rejected instead of silently rounded.
    pub fn parse_major(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().replace(',', "");
        if trimmed.is_empty() {
            return Err(FinreconError::validation("amount is blank"));
        }
        let value = Decimal::from_str(&trimmed)
            .map_err(|e| FinreconError::validation(format!("amount '{raw}' is not numeric: {e}")))?;
        if value.normalize().scale() > constants::MONEY_SCALE {
            return Err(FinreconError::validation(format!(
                "amount '{raw}' has more than {} fractional digits",
                constants::MONEY_SCALE
            )));
        }
        let minor = value
            .checked_mul(Decimal::from(constants::MINOR_UNITS_PER_MAJOR))
            .and_then(|d| d.to_i64())
            .ok_or_else(|| FinreconError::Overflow {
                context: format!("amount '{raw}'"),
            })?;
        Ok(Self(minor))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = constants::MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// An inclusive date range (reconciliation day, settlement month, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Create a period. `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(FinreconError::validation(format!(
                "period start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A single-day period.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The calendar month containing `year`/`month`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| FinreconError::validation(format!("invalid month {year}-{month}")))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| FinreconError::validation(format!("invalid month {year}-{month}")))?;
        let end = next
            .pred_opt()
            .ok_or_else(|| FinreconError::validation(format!("invalid month {year}-{month}")))?;
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Compact label used inside settlement numbers, e.g. `202601`.
    #[must_use]
    pub fn label(&self) -> String {
        let whole_month = self.start.day() == 1
            && self.end.succ_opt().is_none_or(|next| next.day() == 1)
            && self.start.year() == self.end.year()
            && self.start.month() == self.end.month();
        if whole_month {
            format!("{:04}{:02}", self.start.year(), self.start.month())
        } else {
            format!("{}-{}", self.start.format("%Y%m%d"), self.end.format("%Y%m%d"))
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
