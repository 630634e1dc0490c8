//! Month/year selection that gates the upload.

use std::fmt;

use api_types::budget::BudgetQuery;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Earliest selectable year.
pub const MIN_YEAR: i32 = 2000;

/// Returns `true` when the upload (and the reference fetch) must stay off for
/// the selected `month` (1-based) and `year`.
pub fn is_upload_disabled(month: Option<u32>, year: Option<i32>, today: NaiveDate) -> bool {
    let (Some(month), Some(year)) = (month, year) else {
        return true;
    };
    if !(1..=12).contains(&month) {
        return true;
    }
    if year < MIN_YEAR || year > today.year() {
        return true;
    }
    year == today.year() && month > today.month()
}

/// A selectable `(month, year)` pair.
///
/// The month is kept 0-based. [`Timeframe::month`] converts it for people
/// and dates, [`Timeframe::budget_query`] hands it to the budget lookup
/// unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    month0: u32,
    year: i32,
}

impl Timeframe {
    /// Builds the timeframe from the 1-based month the user picked, if the
    /// gate allows it.
    pub fn select(
        month: Option<u32>,
        year: Option<i32>,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        match (month, year) {
            (Some(month), Some(year)) if !is_upload_disabled(Some(month), Some(year), today) => {
                Ok(Self {
                    month0: month - 1,
                    year,
                })
            }
            _ => Err(ValidationError::Timeframe { month, year }),
        }
    }

    /// 1-based month.
    pub fn month(self) -> u32 {
        self.month0 + 1
    }

    pub fn month0(self) -> u32 {
        self.month0
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    pub fn budget_query(self) -> BudgetQuery {
        BudgetQuery {
            month: self.month0,
            year: self.year,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month(), self.year)
    }
}

/// Tracks the month/year inputs and decides when reference data must be
/// (re)loaded: once per distinct valid pair.
#[derive(Debug, Default)]
pub struct TimeframeGate {
    month: Option<u32>,
    year: Option<i32>,
    fetched: Option<Timeframe>,
}

impl TimeframeGate {
    pub fn set_month(&mut self, month: Option<u32>) {
        self.month = month;
    }

    pub fn set_year(&mut self, year: Option<i32>) {
        self.year = year;
    }

    pub fn is_upload_disabled(&self, today: NaiveDate) -> bool {
        is_upload_disabled(self.month, self.year, today)
    }

    /// Current selection, when the gate is open.
    pub fn timeframe(&self, today: NaiveDate) -> Option<Timeframe> {
        Timeframe::select(self.month, self.year, today).ok()
    }

    /// Returns the timeframe to fetch reference data for, or `None` when the
    /// gate is closed or the current pair was already handed out.
    pub fn take_fetch(&mut self, today: NaiveDate) -> Option<Timeframe> {
        let timeframe = self.timeframe(today)?;
        if self.fetched == Some(timeframe) {
            return None;
        }
        self.fetched = Some(timeframe);
        Some(timeframe)
    }
}
