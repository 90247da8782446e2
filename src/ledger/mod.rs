//! Appointment ledger: appointments, their lifecycle, homework and notes.

mod appointments;
mod lifecycle;
mod notes;

pub use appointments::{partition_by_completion, AppointmentFilter, AppointmentTable};
pub use notes::{NoteBook, NoteFilter};
