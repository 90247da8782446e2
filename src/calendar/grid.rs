//! Sunday-first month grids.

use super::grouping::DateGroups;
use crate::error::{BookingError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column headers, Sunday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A calendar month.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Self { first })
            .ok_or_else(|| BookingError::Validation(format!("invalid month {}-{}", year, month)))
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
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

    pub fn days_in_month(&self) -> u32 {
        match self.first.checked_add_months(Months::new(1)) {
            Some(next) => (next - self.first).num_days() as u32,
            // Only reachable in the last representable month, which is December.
            None => 31,
        }
    }

    /// Following month (saturates at the end of the representable range).
    pub fn next(&self) -> Self {
        self.first
            .checked_add_months(Months::new(1))
            .map(|first| Self { first })
            .unwrap_or(*self)
    }

    /// Preceding month (saturates at the start of the representable range).
    pub fn prev(&self) -> Self {
        self.first
            .checked_sub_months(Months::new(1))
            .map(|first| Self { first })
            .unwrap_or(*self)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }
}

impl FromStr for YearMonth {
    type Err = BookingError;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BookingError::Validation(format!("month must be YYYY-MM, got {:?}", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl fmt::Debug for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "YearMonth({})", self)
    }
}

/// One real day in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDay {
    pub date: NaiveDate,
    /// At least one open slot on this date.
    pub bookable: bool,
}

/// A 7-column month matrix. `None` cells are blanks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub month: YearMonth,
    pub weeks: Vec<[Option<GridDay>; 7]>,
}

impl MonthGrid {
    /// Blank cells before the 1st.
    pub fn leading_blanks(&self) -> usize {
        self.cells().take_while(|cell| cell.is_none()).count()
    }

    /// Cells row by row, blanks included.
    pub fn cells(&self) -> impl Iterator<Item = &Option<GridDay>> {
        self.weeks.iter().flat_map(|week| week.iter())
    }

    pub fn days(&self) -> impl Iterator<Item = &GridDay> {
        self.cells().filter_map(|cell| cell.as_ref())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&GridDay> {
        self.days().find(|day| day.date == date)
    }

    pub fn bookable_dates(&self) -> Vec<NaiveDate> {
        self.days()
            .filter(|day| day.bookable)
            .map(|day| day.date)
            .collect()
    }
}

/// Build the grid for `month`, flagging days present in `groups` as bookable.
pub fn month_grid(month: YearMonth, groups: &DateGroups) -> MonthGrid {
    let leading = month.first_day().weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<Option<GridDay>> = vec![None; leading];

    for date in month.first_day().iter_days().take(month.days_in_month() as usize) {
        let bookable = groups.get(&date).is_some_and(|slots| !slots.is_empty());
        cells.push(Some(GridDay { date, bookable }));
    }

    let weeks = cells
        .chunks(7)
        .map(|chunk| {
            let mut week = [None; 7];
            week[..chunk.len()].copy_from_slice(chunk);
            week
        })
        .collect();

    MonthGrid { month, weeks }
}
