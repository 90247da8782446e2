//! Property tests for booking invariants and calendar projections.

use chrono::{Datelike, NaiveDate};
use classbook::{
    closed_ticks, month_grid, AppointmentFilter, DateGroups, Participant, SlotFilter, Store,
    StoreConfig, WallTime, YearMonth,
};
use proptest::prelude::*;

fn wall(minutes: u32) -> WallTime {
    WallTime::from_hm(minutes / 60, minutes % 60).unwrap()
}

proptest! {
    #[test]
    fn range_ticks_are_closed_and_evenly_spaced(
        start in 0u32..(24 * 60),
        span in 0u32..600,
        granularity in 1u32..120,
    ) {
        let end = (start + span).min(24 * 60 - 1);
        let ticks = closed_ticks(wall(start), wall(end), granularity).unwrap();

        prop_assert_eq!(ticks.first().copied(), Some(wall(start)));
        prop_assert!(ticks.iter().all(|t| *t <= wall(end)));
        prop_assert_eq!(ticks.len() as u32, (end - start) / granularity + 1);
        for pair in ticks.windows(2) {
            prop_assert_eq!(
                pair[1].minutes_since_midnight() - pair[0].minutes_since_midnight(),
                granularity
            );
        }
    }

    #[test]
    fn month_grid_blanks_match_weekday(year in 1990i32..2100, month in 1u32..=12) {
        let ym = YearMonth::new(year, month).unwrap();
        let grid = month_grid(ym, &DateGroups::new());
        let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();

        prop_assert_eq!(grid.leading_blanks(), first.weekday().num_days_from_sunday() as usize);
        prop_assert_eq!(grid.days().count() as u32, ym.days_in_month());
        prop_assert!(grid.days().all(|d| d.date.month() == month && !d.bookable));
    }

    #[test]
    fn each_slot_books_at_most_once(
        attempts in proptest::collection::vec((0usize..4, 0u8..3), 1..40),
    ) {
        let store = Store::in_memory(StoreConfig::in_memory());
        let slots = store
            .create_slot_range(
                &Participant::teacher("t-rao", "Ms. Rao"),
                "2025-07-10",
                "10:00",
                "11:30",
                "Algebra",
            )
            .unwrap();

        let mut booked = [false; 4];
        for (slot, student) in attempts {
            let result = store.book_slot(
                slots[slot].id,
                &format!("s{}", student),
                &format!("Student {}", student),
            );
            if booked[slot] {
                prop_assert!(result.unwrap_err().is_conflict());
            } else {
                prop_assert!(result.is_ok());
                booked[slot] = true;
            }
            prop_assert!(store.get_slot(slots[slot].id).unwrap().booked);
        }

        let booked_count = booked.iter().filter(|b| **b).count();
        prop_assert_eq!(store.appointments(&AppointmentFilter::all()).len(), booked_count);
        prop_assert_eq!(store.open_slots(&SlotFilter::all()).len(), 4 - booked_count);
    }
}
