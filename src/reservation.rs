//! Slot reservation.
//!
//! Booking is the one operation where two callers race for the same record.
//! The slot's `booked` flag is flipped with a compare-and-set while the store
//! write lock is held, and the appointment is created in the same critical
//! section, so exactly one caller wins and the loser sees
//! [`BookingError::Conflict`] with nothing written on its behalf.

use crate::error::{BookingError, Result};
use crate::journal::JournalOp;
use crate::store::Store;
use crate::subscriptions::Change;
use crate::types::{require_text, Appointment, AppointmentId, ParticipantId, SlotId};
use tracing::{info, warn};

impl Store {
    /// Book `slot_id` for a student.
    ///
    /// On success the slot is booked and a new appointment copies the slot's
    /// teacher, subject, date and time. Returns the appointment id.
    pub fn book_slot(
        &self,
        slot_id: SlotId,
        student_id: &str,
        student_name: &str,
    ) -> Result<AppointmentId> {
        let student_id = ParticipantId::new(require_text("student id", student_id)?);
        let student_name = require_text("student name", student_name)?;

        let _lock = self.write_lock.lock();
        let mut slots = self.slots.write();

        let slot = slots
            .get(slot_id)
            .ok_or(BookingError::SlotNotFound(slot_id))?
            .clone();
        if slot.booked {
            warn!(slot = %slot_id, student = %student_id, "booking lost race for slot");
            return Err(BookingError::Conflict(format!(
                "slot {} is already booked",
                slot_id
            )));
        }

        let appointment = Appointment {
            id: self.allocate_appointment_id(),
            slot_id,
            student_id,
            student_name,
            teacher_id: slot.teacher_id.clone(),
            teacher_name: slot.teacher_name.clone(),
            subject: slot.subject.clone(),
            date: slot.date,
            time: slot.time,
            homework: None,
            completed: false,
            homework_completed: false,
        };

        self.journal(JournalOp::SlotBooked {
            slot_id,
            appointment: appointment.clone(),
        })?;

        let mut appointments = self.appointments.write();
        let booked = slots.mark_booked(slot_id)?;
        appointments.put(appointment.clone());
        drop(appointments);
        drop(slots);

        info!(
            slot = %slot_id,
            appointment = %appointment.id,
            student = %appointment.student_id,
            "booked slot"
        );

        let id = appointment.id;
        self.publish(&[
            Change::Slot {
                before: Some(slot),
                after: Some(booked),
            },
            Change::Appointment {
                before: None,
                after: Some(appointment),
            },
        ]);
        Ok(id)
    }
}
