//! Analysis date window and the hints callers can pass to shape it.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format for every date exchanged with collaborators.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive analysis window.
///
/// Constructed through [`DateRange::clamped`] so that
/// `start_date <= end_date <= today` always holds for a resolved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Clamp a raw (possibly inverted, possibly future) pair against `today`.
    ///
    /// Any date after `today` becomes `today`; if the start still exceeds the
    /// end afterwards, the start collapses onto the end.
    pub fn clamped(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        let end_date = end.min(today);
        let start_date = start.min(today).min(end_date);
        Self {
            start_date,
            end_date,
        }
    }

    /// The fail-open window: the last `days` days ending today, inclusive.
    pub fn trailing_window(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start_date: today - Duration::days(span),
            end_date: today,
        }
    }

    /// A single-day window.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start_date: day,
            end_date: day,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    /// Number of calendar days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// Whether the range satisfies the resolved-range invariant.
    pub fn is_valid_for(&self, today: NaiveDate) -> bool {
        self.start_date <= self.end_date && self.end_date <= today
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "{}", self.start_date.format(DATE_FORMAT))
        } else {
            write!(
                f,
                "{} ~ {}",
                self.start_date.format(DATE_FORMAT),
                self.end_date.format(DATE_FORMAT)
            )
        }
    }
}

/// How the date expression in a query should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    /// A specific day ("yesterday", "April 7").
    Single,
    /// A whole period ("last week", "this month").
    Period,
    /// No explicit expression; the resolver infers one from context.
    Auto,
}

impl DateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Period => "period",
            Self::Auto => "auto",
        }
    }
}

/// Structured date information a caller already extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DateHint {
    /// Free-text expression known to denote a single day.
    Single { origin: String },
    /// Free-text expression known to denote a period.
    Period { origin: String },
    /// Concrete dates; still clamped against today.
    Exact { start: NaiveDate, end: NaiveDate },
}

/// Outcome of date resolution, kept for transparency in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DateResolution {
    Resolved,
    /// Resolution failed and the default window was used instead.
    Degraded { reason: String },
}

impl DateResolution {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Parse a `YYYY-MM-DD` string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
