//! Error types for the booking store.

use crate::types::{AppointmentId, SlotId};
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Missing or malformed input. The caller must correct and resubmit.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The target changed underneath the caller (already booked, or booked
    /// while deleting). Re-fetch before choosing another target.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotId),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),

    /// The acting participant may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Store already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),
}

impl BookingError {
    /// True for both not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BookingError::SlotNotFound(_) | BookingError::AppointmentNotFound(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingError::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BookingError::Validation(_))
    }

    pub(crate) fn missing(field: &str) -> Self {
        BookingError::Validation(format!("{} is required", field))
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(e: serde_json::Error) -> Self {
        BookingError::Deserialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BookingError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BookingError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BookingError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BookingError::Deserialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, BookingError>;
