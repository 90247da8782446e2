//! Per-date and per-teacher groupings of open slots.

use crate::types::Slot;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Open slots by calendar date; each date's slots ordered by time.
pub type DateGroups = BTreeMap<NaiveDate, Vec<Slot>>;

/// Group slots by date, ordering each day by time (ties by id).
pub fn group_by_date<'a>(slots: impl IntoIterator<Item = &'a Slot>) -> DateGroups {
    let mut groups = DateGroups::new();
    for slot in slots {
        groups.entry(slot.date).or_default().push(slot.clone());
    }
    for day in groups.values_mut() {
        day.sort_by_key(|slot| (slot.time, slot.id));
    }
    groups
}

/// Group slots by teacher display name, then by date.
pub fn group_by_teacher<'a>(
    slots: impl IntoIterator<Item = &'a Slot>,
) -> BTreeMap<String, DateGroups> {
    let mut by_teacher: BTreeMap<String, Vec<&Slot>> = BTreeMap::new();
    for slot in slots {
        by_teacher
            .entry(slot.teacher_name.clone())
            .or_default()
            .push(slot);
    }
    by_teacher
        .into_iter()
        .map(|(name, slots)| (name, group_by_date(slots)))
        .collect()
}

/// Dates that have at least one slot, ascending.
pub fn available_dates(groups: &DateGroups) -> Vec<NaiveDate> {
    groups
        .iter()
        .filter(|(_, slots)| !slots.is_empty())
        .map(|(date, _)| *date)
        .collect()
}
