//! Calendar projections over open slots.
//!
//! Everything here is a pure function of its inputs; callers feed it the
//! current open-slot set (for example from a live subscription's `LiveSet`).

mod grid;
mod grouping;
mod range;

pub use grid::{month_grid, GridDay, MonthGrid, YearMonth, WEEKDAY_LABELS};
pub use grouping::{available_dates, group_by_date, group_by_teacher, DateGroups};
pub use range::{closed_ticks, day_ticks, RangeSelector, DEFAULT_GRANULARITY_MINUTES};
