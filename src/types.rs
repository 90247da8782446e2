//! Core types for the booking store.

use crate::error::{BookingError, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u64);

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an appointment.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub u64);

impl fmt::Debug for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppointmentId({})", self.0)
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity-provider issued participant id. Opaque to the store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        ParticipantId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Participant role as asserted by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// A verified caller: identity pair plus the display name copied into records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
}

impl Participant {
    pub fn teacher(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
            role: Role::Teacher,
        }
    }

    pub fn student(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
            role: Role::Student,
        }
    }

    /// Fail unless the participant holds `role`.
    pub(crate) fn require_role(&self, role: Role) -> Result<()> {
        if self.role != role {
            return Err(BookingError::Forbidden(format!(
                "{} {} cannot act as {}",
                self.role, self.id, role
            )));
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_blank() {
            return Err(BookingError::missing("participant id"));
        }
        if self.name.trim().is_empty() {
            return Err(BookingError::missing("participant name"));
        }
        Ok(())
    }
}

/// Wall-clock time of day, `HH:MM`, with no timezone attached.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime(NaiveTime);

impl WallTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(WallTime)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    /// Time `minutes` later, or None when it would cross midnight.
    pub fn checked_add_minutes(&self, minutes: u32) -> Option<Self> {
        let total = self.minutes_since_midnight().checked_add(minutes)?;
        if total >= 24 * 60 {
            return None;
        }
        Self::from_hm(total / 60, total % 60)
    }

    /// Parse `HH:MM` input, reporting `field` on failure.
    pub fn parse_field(field: &str, input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BookingError::missing(field));
        }
        trimmed.parse().map_err(|_| {
            BookingError::Validation(format!("{} must be HH:MM, got {:?}", field, input))
        })
    }
}

impl FromStr for WallTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M").map(WallTime)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl fmt::Debug for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WallTime({})", self)
    }
}

impl Serialize for WallTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`), reporting `field` on failure.
pub fn parse_date(field: &str, input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BookingError::missing(field));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        BookingError::Validation(format!("{} must be YYYY-MM-DD, got {:?}", field, input))
    })
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::missing(field));
    }
    Ok(trimmed.to_string())
}

/// A teacher-declared bookable time unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub teacher_id: ParticipantId,
    pub teacher_name: String,
    pub date: NaiveDate,
    pub time: WallTime,
    pub subject: String,
    pub booked: bool,
}

/// A confirmed booking of one slot by one student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    /// Slot this appointment was booked from.
    pub slot_id: SlotId,
    pub student_id: ParticipantId,
    pub student_name: String,
    pub teacher_id: ParticipantId,
    pub teacher_name: String,
    pub subject: String,
    pub date: NaiveDate,
    pub time: WallTime,
    #[serde(default)]
    pub homework: Option<String>,
    /// The class itself took place. One-way.
    pub completed: bool,
    /// The student's own homework marker. Unrelated to `completed`.
    #[serde(default)]
    pub homework_completed: bool,
}

impl Appointment {
    pub fn has_homework(&self) -> bool {
        self.homework.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Name of the other party from `role`'s point of view.
    pub fn counterpart_name(&self, role: Role) -> &str {
        match role {
            Role::Teacher => &self.student_name,
            Role::Student => &self.teacher_name,
        }
    }

    /// Whether `participant` is the party of this appointment holding their role.
    pub fn involves(&self, participant: &Participant) -> bool {
        match participant.role {
            Role::Teacher => self.teacher_id == participant.id,
            Role::Student => self.student_id == participant.id,
        }
    }
}

/// Deterministic note key: one note per author role per appointment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteKey {
    pub author_role: Role,
    pub appointment_id: AppointmentId,
}

/// Free-text note a teacher or student keeps on an appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub key: NoteKey,
    pub author_id: ParticipantId,
    pub subject: String,
    pub counterpart_name: String,
    pub text: String,
    pub updated_at: Timestamp,
}
