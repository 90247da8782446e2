//! Teacher-side slot mutations.

use crate::calendar::closed_ticks;
use crate::error::{BookingError, Result};
use crate::journal::JournalOp;
use crate::store::Store;
use crate::subscriptions::Change;
use crate::types::{parse_date, require_text, Participant, Role, Slot, SlotId, WallTime};
use chrono::NaiveDate;
use tracing::{debug, info};

impl Store {
    /// Create one unbooked slot owned by `teacher`.
    pub fn create_slot(
        &self,
        teacher: &Participant,
        date: &str,
        time: &str,
        subject: &str,
    ) -> Result<Slot> {
        teacher.validate()?;
        teacher.require_role(Role::Teacher)?;
        let date = parse_date("date", date)?;
        let time = WallTime::parse_field("time", time)?;
        let subject = require_text("subject", subject)?;

        let _lock = self.write_lock.lock();
        self.insert_slot_locked(teacher, date, time, subject)
    }

    /// Create one slot per configured tick in the closed range `[start, end]`.
    pub fn create_slot_range(
        &self,
        teacher: &Participant,
        date: &str,
        start: &str,
        end: &str,
        subject: &str,
    ) -> Result<Vec<Slot>> {
        self.create_slot_range_with(
            teacher,
            date,
            start,
            end,
            subject,
            self.config.slot_granularity_minutes,
        )
    }

    /// Like [`Store::create_slot_range`] with an explicit tick spacing.
    ///
    /// Each slot is committed on its own. If a write fails partway, the slots
    /// already created remain.
    pub fn create_slot_range_with(
        &self,
        teacher: &Participant,
        date: &str,
        start: &str,
        end: &str,
        subject: &str,
        granularity_minutes: u32,
    ) -> Result<Vec<Slot>> {
        teacher.validate()?;
        teacher.require_role(Role::Teacher)?;
        let date = parse_date("date", date)?;
        let start = WallTime::parse_field("start time", start)?;
        let end = WallTime::parse_field("end time", end)?;
        let subject = require_text("subject", subject)?;
        let ticks = closed_ticks(start, end, granularity_minutes)?;

        let mut created = Vec::with_capacity(ticks.len());
        for time in ticks {
            let _lock = self.write_lock.lock();
            created.push(self.insert_slot_locked(teacher, date, time, subject.clone())?);
        }

        info!(
            teacher = %teacher.id,
            %date,
            %start,
            %end,
            count = created.len(),
            "created slot range"
        );
        Ok(created)
    }

    /// Delete an unbooked slot. Only its owning teacher may delete it.
    pub fn delete_slot(&self, teacher: &Participant, slot_id: SlotId) -> Result<()> {
        teacher.require_role(Role::Teacher)?;

        let _lock = self.write_lock.lock();
        let mut slots = self.slots.write();

        let slot = slots.get(slot_id).ok_or(BookingError::SlotNotFound(slot_id))?;
        if slot.teacher_id != teacher.id {
            return Err(BookingError::Forbidden(format!(
                "slot {} belongs to another teacher",
                slot_id
            )));
        }
        if slot.booked {
            return Err(BookingError::Conflict(format!(
                "slot {} is booked and cannot be deleted",
                slot_id
            )));
        }

        self.journal(JournalOp::SlotDeleted { slot_id })?;
        let removed = slots.remove_unbooked(slot_id)?;
        drop(slots);

        debug!(slot = %slot_id, "deleted slot");
        self.publish(&[Change::Slot {
            before: Some(removed),
            after: None,
        }]);
        Ok(())
    }

    /// Caller holds `write_lock`.
    fn insert_slot_locked(
        &self,
        teacher: &Participant,
        date: NaiveDate,
        time: WallTime,
        subject: String,
    ) -> Result<Slot> {
        let slot = Slot {
            id: self.allocate_slot_id(),
            teacher_id: teacher.id.clone(),
            teacher_name: teacher.name.trim().to_string(),
            date,
            time,
            subject,
            booked: false,
        };

        self.journal(JournalOp::SlotCreated(slot.clone()))?;
        self.slots.write().insert(slot.clone());

        debug!(slot = %slot.id, teacher = %slot.teacher_id, %date, %time, "created slot");
        self.publish(&[Change::Slot {
            before: None,
            after: Some(slot.clone()),
        }]);
        Ok(slot)
    }
}
