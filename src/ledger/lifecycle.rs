//! Appointment lifecycle: homework, completion, rescheduling and notes.

use crate::error::{BookingError, Result};
use crate::journal::JournalOp;
use crate::store::Store;
use crate::subscriptions::Change;
use crate::types::{
    parse_date, require_text, Appointment, AppointmentId, Note, NoteKey, Participant, Role,
    Timestamp, WallTime,
};
use tracing::debug;

impl Store {
    /// Set or replace the homework on an appointment. Empty text clears it.
    pub fn assign_homework(
        &self,
        teacher: &Participant,
        id: AppointmentId,
        text: &str,
    ) -> Result<Appointment> {
        let text = text.trim();
        let homework = (!text.is_empty()).then(|| text.to_string());

        let (appointment, _) =
            self.update_appointment(teacher, Role::Teacher, id, "assign homework", |a| {
                if a.homework == homework {
                    return Ok(false);
                }
                a.homework = homework;
                Ok(true)
            })?;
        Ok(appointment)
    }

    /// Flip the student's own homework-done marker.
    pub fn toggle_homework_completed(
        &self,
        student: &Participant,
        id: AppointmentId,
    ) -> Result<Appointment> {
        let (appointment, _) =
            self.update_appointment(student, Role::Student, id, "toggle homework", |a| {
                a.homework_completed = !a.homework_completed;
                Ok(true)
            })?;
        Ok(appointment)
    }

    /// Mark the class as held. Returns false if it already was.
    pub fn mark_completed(&self, teacher: &Participant, id: AppointmentId) -> Result<bool> {
        let (_, changed) =
            self.update_appointment(teacher, Role::Teacher, id, "mark completed", |a| {
                if a.completed {
                    return Ok(false);
                }
                a.completed = true;
                Ok(true)
            })?;
        Ok(changed)
    }

    /// Move an appointment to a new date and time.
    ///
    /// The destination is not checked against other appointments or slots.
    pub fn reschedule(
        &self,
        teacher: &Participant,
        id: AppointmentId,
        date: &str,
        time: &str,
    ) -> Result<Appointment> {
        let date = parse_date("date", date)?;
        let time = WallTime::parse_field("time", time)?;

        let (appointment, _) =
            self.update_appointment(teacher, Role::Teacher, id, "reschedule", |a| {
                if a.completed {
                    return Err(BookingError::Conflict(format!(
                        "appointment {} is already completed",
                        a.id
                    )));
                }
                if a.date == date && a.time == time {
                    return Ok(false);
                }
                a.date = date;
                a.time = time;
                Ok(true)
            })?;
        Ok(appointment)
    }

    /// Save the author's note on an appointment, replacing any earlier text.
    ///
    /// Each party has one note per appointment, keyed by their role.
    pub fn attach_note(&self, author: &Participant, id: AppointmentId, text: &str) -> Result<Note> {
        let text = require_text("note text", text)?;

        let _lock = self.write_lock.lock();
        let appointment = self.involved_appointment(author, id)?;

        let key = NoteKey {
            author_role: author.role,
            appointment_id: id,
        };
        let note = Note {
            key,
            author_id: author.id.clone(),
            subject: appointment.subject.clone(),
            counterpart_name: appointment.counterpart_name(author.role).to_string(),
            text,
            updated_at: Timestamp::now(),
        };

        self.journal(JournalOp::NoteSaved(note.clone()))?;
        let before = self.notes.write().upsert(note.clone());

        debug!(appointment = %id, role = %author.role, "saved note");
        self.publish(&[Change::Note {
            before,
            after: Some(note.clone()),
        }]);
        Ok(note)
    }

    /// Read-modify-write one appointment on behalf of `actor`.
    ///
    /// `mutate` returns whether it changed anything; unchanged appointments are
    /// neither journaled nor published.
    fn update_appointment<F>(
        &self,
        actor: &Participant,
        role: Role,
        id: AppointmentId,
        action: &'static str,
        mutate: F,
    ) -> Result<(Appointment, bool)>
    where
        F: FnOnce(&mut Appointment) -> Result<bool>,
    {
        actor.require_role(role)?;

        let _lock = self.write_lock.lock();
        let before = self.involved_appointment(actor, id)?;

        let mut after = before.clone();
        if !mutate(&mut after)? {
            return Ok((after, false));
        }

        self.journal(JournalOp::AppointmentUpdated(after.clone()))?;
        self.appointments.write().put(after.clone());

        debug!(appointment = %id, action, "updated appointment");
        self.publish(&[Change::Appointment {
            before: Some(before),
            after: Some(after.clone()),
        }]);
        Ok((after, true))
    }

    fn involved_appointment(&self, actor: &Participant, id: AppointmentId) -> Result<Appointment> {
        let appointment = self
            .appointments
            .read()
            .get(id)
            .cloned()
            .ok_or(BookingError::AppointmentNotFound(id))?;
        if !appointment.involves(actor) {
            return Err(BookingError::Forbidden(format!(
                "{} {} is not part of appointment {}",
                actor.role, actor.id, id
            )));
        }
        Ok(appointment)
    }
}
