//! Next-occurrence arithmetic for dates that recur every year.
//!
//! Birthdays, anniversaries and custom events only carry a month and a day
//! that matter; the stored year is ignored. Given a reference day ("today")
//! the engine finds the nearest occurrence on or after it and classifies it
//! into a reporting window.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{LojaError, Result};

/// Where a Feb 29 date is observed in years without a Feb 29.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeapDayPolicy {
    #[default]
    Feb28,
    Mar1,
}

impl fmt::Display for LeapDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeapDayPolicy::Feb28 => f.write_str("feb28"),
            LeapDayPolicy::Mar1 => f.write_str("mar1"),
        }
    }
}

/// A month/day pair without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Accepts any day that exists in a leap year, so Feb 29 is valid.
    pub fn new(month: u32, day: u32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(LojaError::Validation(format!(
                "{day:02}/{month:02} is not a calendar day"
            )));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }

    /// The date this month/day falls on in `year`.
    pub fn in_year(&self, year: i32, policy: LeapDayPolicy) -> NaiveDate {
        let leap_year = NaiveDate::from_ymd_opt(year, 2, 29).is_some();
        let (month, day) = match policy {
            _ if leap_year || !self.is_leap_day() => (self.month, self.day),
            LeapDayPolicy::Feb28 => (2, 28),
            LeapDayPolicy::Mar1 => (3, 1),
        };
        // Years outside chrono's range saturate.
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
    }
}

impl From<NaiveDate> for MonthDay {
    fn from(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.day, self.month)
    }
}

/// Nearest occurrence of `md` on or after `today`.
///
/// The candidate is built in today's year; if it already passed it moves to
/// the following year, recomputed under the leap-day policy for that year.
pub fn next_occurrence(md: MonthDay, today: NaiveDate, policy: LeapDayPolicy) -> NaiveDate {
    let candidate = md.in_year(today.year(), policy);
    if candidate < today {
        md.in_year(today.year() + 1, policy)
    } else {
        candidate
    }
}

pub fn is_today(candidate: NaiveDate, today: NaiveDate) -> bool {
    candidate.year() == today.year()
        && candidate.month() == today.month()
        && candidate.day() == today.day()
}

/// Reporting window for upcoming occurrences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Window {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl Window {
    /// `candidate` must come from [`next_occurrence`] for the same `today`.
    ///
    /// The month window compares the month number only, so an occurrence
    /// that already passed this month (and moved to next year) still counts.
    pub fn contains(&self, candidate: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Window::All => true,
            Window::Today => is_today(candidate, today),
            Window::Week => today <= candidate && candidate <= today + Duration::days(7),
            Window::Month => candidate.month() == today.month(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Window::Today => "today",
            Window::Week => "next 7 days",
            Window::Month => "this month",
            Window::All => "all",
        }
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" | "hoje" => Ok(Window::Today),
            "week" | "semana" => Ok(Window::Week),
            "month" | "mes" | "mês" => Ok(Window::Month),
            "all" | "todos" => Ok(Window::All),
            other => Err(format!(
                "unknown window '{other}' (expected today, week, month or all)"
            )),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Window::Today => "today",
            Window::Week => "week",
            Window::Month => "month",
            Window::All => "all",
        };
        f.write_str(s)
    }
}
