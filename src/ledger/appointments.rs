//! Appointment table and filters.

use crate::types::{Appointment, AppointmentId, ParticipantId};
use std::collections::BTreeMap;

/// Filter for appointment queries. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub student_id: Option<ParticipantId>,
    pub teacher_id: Option<ParticipantId>,
    pub completed: Option<bool>,
    /// Only appointments carrying non-empty homework.
    pub has_homework: Option<bool>,
}

impl AppointmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(ParticipantId::new(student_id)),
            ..Default::default()
        }
    }

    pub fn for_teacher(teacher_id: impl Into<String>) -> Self {
        Self {
            teacher_id: Some(ParticipantId::new(teacher_id)),
            ..Default::default()
        }
    }

    pub fn upcoming_for_student(student_id: impl Into<String>) -> Self {
        Self::for_student(student_id).completed(false)
    }

    pub fn past_for_student(student_id: impl Into<String>) -> Self {
        Self::for_student(student_id).completed(true)
    }

    pub fn upcoming_for_teacher(teacher_id: impl Into<String>) -> Self {
        Self::for_teacher(teacher_id).completed(false)
    }

    pub fn past_for_teacher(teacher_id: impl Into<String>) -> Self {
        Self::for_teacher(teacher_id).completed(true)
    }

    /// A student's homework list.
    pub fn homework_for_student(student_id: impl Into<String>) -> Self {
        Self {
            has_homework: Some(true),
            ..Self::for_student(student_id)
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(ParticipantId::new(teacher_id));
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(ref student_id) = self.student_id {
            if &appointment.student_id != student_id {
                return false;
            }
        }
        if let Some(ref teacher_id) = self.teacher_id {
            if &appointment.teacher_id != teacher_id {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if appointment.completed != completed {
                return false;
            }
        }
        if let Some(has_homework) = self.has_homework {
            if appointment.has_homework() != has_homework {
                return false;
            }
        }
        true
    }
}

/// Split appointments into (upcoming, past) on `completed`.
pub fn partition_by_completion(
    appointments: impl IntoIterator<Item = Appointment>,
) -> (Vec<Appointment>, Vec<Appointment>) {
    appointments.into_iter().partition(|a| !a.completed)
}

/// All appointments, keyed by id.
#[derive(Debug, Default)]
pub struct AppointmentTable {
    appointments: BTreeMap<AppointmentId, Appointment>,
}

impl AppointmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an appointment.
    pub fn put(&mut self, appointment: Appointment) {
        self.appointments.insert(appointment.id, appointment);
    }

    pub fn get(&self, id: AppointmentId) -> Option<&Appointment> {
        self.appointments.get(&id)
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn max_id(&self) -> Option<AppointmentId> {
        self.appointments.keys().next_back().copied()
    }

    pub fn completed_count(&self) -> usize {
        self.appointments.values().filter(|a| a.completed).count()
    }

    /// Matching appointments ordered by date, time, then id.
    pub fn query(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.date, a.time, a.id).cmp(&(b.date, b.time, b.id)));
        found
    }
}
