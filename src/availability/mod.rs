//! Availability store: teacher-declared slots.

mod operations;
mod table;

pub use table::{SlotFilter, SlotTable};
