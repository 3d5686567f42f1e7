//! Partially specified dates.

use crate::array::time::{from_datetime, to_datetime};

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, Timelike};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A point in time where only the year is mandatory.
///
/// The file index keys on `hash_key`, which concatenates the present fields in
/// decimal. Two containers are equal only when the same fields are set to the same
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContainer {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
}

impl DateContainer {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
            hour: None,
        }
    }

    pub fn month_year(year: i32, month: u32) -> Self {
        Self {
            month: Some(month),
            ..Self::year(year)
        }
    }

    pub fn full(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
            hour: Some(hour),
        }
    }

    /// Container with every field taken from an instant.
    pub fn from_instant(instant: i64) -> Self {
        let dt = to_datetime(instant);
        Self::full(dt.year(), dt.month(), dt.day(), dt.hour())
    }

    pub fn hash_key(&self) -> i64 {
        [self.month, self.day, self.hour]
            .iter()
            .flatten()
            .fold(self.year as i64, |acc, field| acc * 100 + *field as i64)
    }

    pub fn has_day(&self) -> bool {
        self.day.is_some()
    }

    pub fn has_hour(&self) -> bool {
        self.hour.is_some()
    }

    pub fn unset_day(&mut self) {
        self.day = None;
    }

    pub fn unset_hour(&mut self) {
        self.hour = None;
    }

    /// The first instant covered by this container (missing fields default to the start).
    pub fn to_instant(&self) -> Result<i64> {
        let datetime = NaiveDate::from_ymd_opt(
            self.year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
        )
        .and_then(|d| d.and_hms_opt(self.hour.unwrap_or(0), 0, 0))
        .ok_or_else(|| anyhow!("Invalid date {}", self))?;
        from_datetime(datetime)
    }

    /// Shifts the container back by `delta` nanoseconds, keeping its specificity.
    pub fn subtract(&self, delta: i64) -> Result<Self> {
        let dt = to_datetime(self.to_instant()? - delta);
        Ok(Self {
            year: dt.year(),
            month: self.month.map(|_| dt.month()),
            day: self.day.map(|_| dt.day()),
            hour: self.hour.map(|_| dt.hour()),
        })
    }
}

impl Hash for DateContainer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_key().hash(state);
    }
}

impl fmt::Display for DateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Year: {} Month: {:?} Day: {:?} Hour: {:?}",
            self.year, self.month, self.day, self.hour
        )
    }
}
