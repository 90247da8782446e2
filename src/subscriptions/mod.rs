//! Subscription system for live query updates.
//!
//! Every committed mutation is pushed to the live queries it affects:
//! - Open slots (optionally per teacher)
//! - Appointments (by student, teacher, completion, homework)
//! - Notes (by author, appointment, subject/counterpart)
//!
//! Each subscriber receives a `Snapshot` of its result set first, then
//! `Upserted`/`Removed` deltas. Handles unsubscribe when dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.list_open_slots(SlotFilter::for_teacher("t1"));
//! let mut view = LiveSet::new();
//!
//! while let Ok(event) = handle.recv() {
//!     if !view.apply(event) {
//!         break;
//!     }
//!     render(view.items());
//! }
//! ```

mod manager;
mod types;

pub use manager::{Change, SubscriptionManager, DEFAULT_BUFFER_SIZE};
pub use types::{DropReason, LiveEvent, LiveRecord, LiveSet, SubscriptionHandle, SubscriptionId};
