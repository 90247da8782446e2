//! Fixed-granularity time ticks and two-click range selection.

use crate::error::{BookingError, Result};
use crate::types::WallTime;

/// Default tick spacing, minutes.
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 30;

/// Ticks at every `granularity_minutes` step in the closed interval `[start, end]`.
pub fn closed_ticks(
    start: WallTime,
    end: WallTime,
    granularity_minutes: u32,
) -> Result<Vec<WallTime>> {
    if granularity_minutes == 0 {
        return Err(BookingError::Validation(
            "granularity must be at least one minute".into(),
        ));
    }
    if start > end {
        return Err(BookingError::Validation(format!(
            "start time {} is after end time {}",
            start, end
        )));
    }

    let mut ticks = Vec::new();
    let mut current = Some(start);
    while let Some(tick) = current {
        if tick > end {
            break;
        }
        ticks.push(tick);
        current = tick.checked_add_minutes(granularity_minutes);
    }
    Ok(ticks)
}

/// Ticks offered for one day in `[day_start, day_end)`.
pub fn day_ticks(
    day_start: WallTime,
    day_end: WallTime,
    granularity_minutes: u32,
) -> Vec<WallTime> {
    match closed_ticks(day_start, day_end, granularity_minutes.max(1)) {
        Ok(mut ticks) => {
            ticks.retain(|tick| *tick < day_end);
            ticks
        }
        Err(_) => Vec::new(),
    }
}

/// Two-click start/end selection over a fixed list of ticks.
///
/// First click sets the start. A later click sets the end. Any other click,
/// or any click once both ends are set, starts over at the clicked tick.
#[derive(Clone, Debug)]
pub struct RangeSelector {
    ticks: Vec<WallTime>,
    start: Option<WallTime>,
    end: Option<WallTime>,
}

impl RangeSelector {
    pub fn new(ticks: Vec<WallTime>) -> Self {
        Self {
            ticks,
            start: None,
            end: None,
        }
    }

    /// Selector over one day's half-open tick list.
    pub fn for_day(day_start: WallTime, day_end: WallTime, granularity_minutes: u32) -> Self {
        Self::new(day_ticks(day_start, day_end, granularity_minutes))
    }

    pub fn ticks(&self) -> &[WallTime] {
        &self.ticks
    }

    /// Register a click on `tick`.
    pub fn select(&mut self, tick: WallTime) -> Result<()> {
        if !self.ticks.contains(&tick) {
            return Err(BookingError::Validation(format!(
                "{} is not a selectable time",
                tick
            )));
        }

        match (self.start, self.end) {
            (Some(start), None) if tick > start => {
                self.end = Some(tick);
            }
            _ => {
                self.start = Some(tick);
                self.end = None;
            }
        }
        Ok(())
    }

    pub fn start(&self) -> Option<WallTime> {
        self.start
    }

    pub fn end(&self) -> Option<WallTime> {
        self.end
    }

    /// Both ends, once the selection is complete.
    pub fn bounds(&self) -> Option<(WallTime, WallTime)> {
        Some((self.start?, self.end?))
    }

    /// Ticks from start to end inclusive; empty until both are set.
    pub fn selected_ticks(&self) -> &[WallTime] {
        let Some((start, end)) = self.bounds() else {
            return &[];
        };
        let from = self.ticks.iter().position(|t| *t == start);
        let to = self.ticks.iter().position(|t| *t == end);
        match (from, to) {
            (Some(from), Some(to)) if from <= to => &self.ticks[from..=to],
            _ => &[],
        }
    }

    pub fn is_selected(&self, tick: WallTime) -> bool {
        self.selected_ticks().contains(&tick)
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
    }
}
