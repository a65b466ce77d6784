use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// `end` was not after `start` for a working shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid time range: end {end} is not after start {start}")]
pub struct InvalidRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// The civil date "now" in `tz`, whatever zone the host runs in.
pub fn local_today<Tz: TimeZone>(tz: &Tz) -> NaiveDate {
    local_today_at(tz, Utc::now())
}

pub fn local_today_at<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Worked time between `start` and `end` minus the break, floored at zero.
///
/// Shifts never cross midnight, so `end <= start` is a data error rather
/// than an overnight shift.
pub fn net_hours(start: NaiveTime, end: NaiveTime, break_minutes: u32) -> Result<Hours, InvalidRange> {
    if end <= start {
        return Err(InvalidRange { start, end });
    }
    let span = (end - start).num_minutes();
    let net = (span - i64::from(break_minutes)).max(0);
    Ok(Hours::from_minutes(net as u32))
}

// =====================
// Hours
// =====================

/// A non-negative amount of worked time, kept exactly as whole minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours {
    minutes: u32,
}

impl Hours {
    pub const ZERO: Hours = Hours { minutes: 0 };

    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.minutes) / 60.0
    }

    /// One decimal place, rounded half up: 510 minutes -> "8.5".
    pub fn to_decimal_string(&self) -> String {
        let tenths = (u64::from(self.minutes) * 10 + 30) / 60;
        format!("{}.{}", tenths / 10, tenths % 10)
    }

    /// `HH:MM`, hours not wrapped at 24.
    pub fn to_hhmm(&self) -> String {
        format!("{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl Add for Hours {
    type Output = Hours;

    fn add(self, rhs: Hours) -> Hours {
        Hours::from_minutes(self.minutes + rhs.minutes)
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Hours) {
        self.minutes += rhs.minutes;
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Hours {
        iter.fold(Hours::ZERO, Add::add)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

// =====================
// YearMonth
// =====================

/// A calendar month, e.g. `2024-06`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
    last: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid YYYY-MM month")]
pub struct ParseYearMonthError(pub String);

impl YearMonth {
    /// `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(Self { first, last })
    }

    /// The month `date` falls in.
    pub fn of(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { first, last }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        YearMonth::new(year, month).ok_or_else(err)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
