//! # classbook
//!
//! Slot reservation and appointment lifecycle engine for one-to-one tutoring.
//!
//! ## Core Concepts
//!
//! - **Slots**: Teacher-declared bookable times, claimed by at most one student
//! - **Reservation**: Atomic slot-to-appointment conversion
//! - **Ledger**: Appointments with homework, completion and per-party notes
//! - **Calendar**: Pure projections (month grids, date groups, range selection)
//! - **Subscriptions**: Live, filtered views pushed on every change
//! - **Journal**: Checksummed on-disk log replayed on open
//!
//! ## Example
//!
//! ```ignore
//! use classbook::{Participant, SlotFilter, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig::at("./classbook"))?;
//! let teacher = Participant::teacher("t1", "Ms. Rao");
//!
//! // Publish availability
//! let slots = store.create_slot_range(&teacher, "2025-07-10", "14:00", "16:00", "Algebra")?;
//!
//! // Watch open slots
//! let live = store.list_open_slots(SlotFilter::for_teacher("t1"));
//!
//! // Book one
//! let appointment = store.book_slot(slots[0].id, "s1", "Ana")?;
//! ```

pub mod availability;
pub mod calendar;
pub mod error;
pub mod journal;
pub mod ledger;
mod reservation;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use availability::{SlotFilter, SlotTable};
pub use calendar::{
    available_dates, closed_ticks, day_ticks, group_by_date, group_by_teacher, month_grid,
    DateGroups, GridDay, MonthGrid, RangeSelector, YearMonth, DEFAULT_GRANULARITY_MINUTES,
    WEEKDAY_LABELS,
};
pub use error::{BookingError, Result};
pub use journal::{Journal, JournalEntry, JournalOp};
pub use ledger::{
    partition_by_completion, AppointmentFilter, AppointmentTable, NoteBook, NoteFilter,
};
pub use store::{Store, StoreConfig, StoreStats};
pub use subscriptions::{
    Change, DropReason, LiveEvent, LiveRecord, LiveSet, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
pub use types::*;
