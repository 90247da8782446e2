//! In-memory slot table.

use crate::error::{BookingError, Result};
use crate::types::{ParticipantId, Slot, SlotId};
use std::collections::BTreeMap;

/// Filter for open-slot queries. Booked slots never match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotFilter {
    /// Restrict to one teacher (None = all teachers).
    pub teacher_id: Option<ParticipantId>,
}

impl SlotFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_teacher(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: Some(ParticipantId::new(teacher_id)),
        }
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        if slot.booked {
            return false;
        }
        match &self.teacher_id {
            Some(teacher_id) => &slot.teacher_id == teacher_id,
            None => true,
        }
    }
}

/// All slots, keyed by id.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: BTreeMap<SlotId, Slot>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: Slot) {
        self.slots.insert(slot.id, slot);
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_id(&self) -> Option<SlotId> {
        self.slots.keys().next_back().copied()
    }

    /// Remove a slot that has not been booked.
    pub fn remove_unbooked(&mut self, id: SlotId) -> Result<Slot> {
        match self.slots.get(&id) {
            None => Err(BookingError::SlotNotFound(id)),
            Some(slot) if slot.booked => Err(BookingError::Conflict(format!(
                "slot {} is booked and cannot be deleted",
                id
            ))),
            Some(_) => self.slots.remove(&id).ok_or(BookingError::SlotNotFound(id)),
        }
    }

    /// Compare-and-set `booked` from false to true.
    ///
    /// Returns the slot as it is after the flip.
    pub fn mark_booked(&mut self, id: SlotId) -> Result<Slot> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(BookingError::SlotNotFound(id))?;
        if slot.booked {
            return Err(BookingError::Conflict(format!("slot {} is already booked", id)));
        }
        slot.booked = true;
        Ok(slot.clone())
    }

    /// Unbooked slots matching `filter`, ordered by date, time, then id.
    pub fn open_slots(&self, filter: &SlotFilter) -> Vec<Slot> {
        let mut open: Vec<Slot> = self
            .slots
            .values()
            .filter(|slot| filter.matches(slot))
            .cloned()
            .collect();
        open.sort_by(|a, b| (a.date, a.time, a.id).cmp(&(b.date, b.time, b.id)));
        open
    }

    pub fn open_count(&self) -> usize {
        self.slots.values().filter(|slot| !slot.booked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WallTime;
    use chrono::NaiveDate;

    fn slot(id: u64, teacher: &str, day: u32, time: &str) -> Slot {
        Slot {
            id: SlotId(id),
            teacher_id: ParticipantId::new(teacher),
            teacher_name: teacher.to_uppercase(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            time: time.parse::<WallTime>().unwrap(),
            subject: "Chemistry".into(),
            booked: false,
        }
    }

    #[test]
    fn test_mark_booked_only_once() {
        let mut table = SlotTable::new();
        table.insert(slot(1, "t1", 1, "10:00"));

        let booked = table.mark_booked(SlotId(1)).unwrap();
        assert!(booked.booked);

        let again = table.mark_booked(SlotId(1));
        assert!(matches!(again, Err(BookingError::Conflict(_))));
        assert!(table.get(SlotId(1)).unwrap().booked);
    }

    #[test]
    fn test_mark_booked_missing() {
        let mut table = SlotTable::new();
        assert!(matches!(
            table.mark_booked(SlotId(9)),
            Err(BookingError::SlotNotFound(SlotId(9)))
        ));
    }

    #[test]
    fn test_remove_booked_conflicts() {
        let mut table = SlotTable::new();
        table.insert(slot(1, "t1", 1, "10:00"));
        table.insert(slot(2, "t1", 1, "10:30"));
        table.mark_booked(SlotId(1)).unwrap();

        assert!(matches!(
            table.remove_unbooked(SlotId(1)),
            Err(BookingError::Conflict(_))
        ));
        assert_eq!(table.remove_unbooked(SlotId(2)).unwrap().id, SlotId(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_open_slots_ordered_and_filtered() {
        let mut table = SlotTable::new();
        table.insert(slot(1, "t1", 2, "09:00"));
        table.insert(slot(2, "t1", 1, "11:00"));
        table.insert(slot(3, "t1", 1, "10:00"));
        table.insert(slot(4, "t2", 1, "08:00"));
        table.mark_booked(SlotId(3)).unwrap();

        let ids: Vec<u64> = table
            .open_slots(&SlotFilter::for_teacher("t1"))
            .iter()
            .map(|s| s.id.0)
            .collect();
        assert_eq!(ids, vec![2, 1]);

        assert_eq!(table.open_slots(&SlotFilter::all()).len(), 3);
        assert_eq!(table.open_count(), 3);
        assert_eq!(table.max_id(), Some(SlotId(4)));
    }
}
