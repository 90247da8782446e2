//! Subscription types for live query updates.

use crate::types::{Appointment, AppointmentId, Note, NoteKey, Slot, SlotId};
use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use super::manager::SubscriptionManager;

/// A record type that can be served by a live query.
pub trait LiveRecord: Clone + Debug + Send + 'static {
    type Key: Copy + Ord + Hash + Debug + Send;

    fn key(&self) -> Self::Key;
}

impl LiveRecord for Slot {
    type Key = SlotId;

    fn key(&self) -> SlotId {
        self.id
    }
}

impl LiveRecord for Appointment {
    type Key = AppointmentId;

    fn key(&self) -> AppointmentId {
        self.id
    }
}

impl LiveRecord for Note {
    type Key = NoteKey;

    fn key(&self) -> NoteKey {
        self.key
    }
}

/// Events delivered to one subscriber.
#[derive(Clone, Debug)]
pub enum LiveEvent<T> {
    /// Full result set at subscription time. Always the first event.
    Snapshot(Vec<T>),

    /// A record entered the result set or changed while inside it.
    Upserted(T),

    /// A record left the result set. Carries its last matching version.
    Removed(T),

    /// The broker stopped serving this subscription.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// The store shut down.
    StoreClosed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Owned handle to a live query.
///
/// Dropping the handle (or calling [`cancel`](Self::cancel)) unregisters it;
/// nothing is delivered afterwards.
pub struct SubscriptionHandle<T> {
    pub id: SubscriptionId,
    receiver: Receiver<LiveEvent<T>>,
    manager: Weak<SubscriptionManager>,
}

impl<T> SubscriptionHandle<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: Receiver<LiveEvent<T>>,
        manager: Weak<SubscriptionManager>,
    ) -> Self {
        Self {
            id,
            receiver,
            manager,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<LiveEvent<T>, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<LiveEvent<T>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<LiveEvent<T>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Whether the broker still delivers to this handle.
    pub fn is_active(&self) -> bool {
        self.manager
            .upgrade()
            .is_some_and(|manager| manager.contains(self.id))
    }

    /// Release the subscription now.
    pub fn cancel(self) {}
}

impl<T> Drop for SubscriptionHandle<T> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.unsubscribe(self.id);
        }
    }
}

/// Client-side materialization of a live query's current result set.
#[derive(Clone, Debug)]
pub struct LiveSet<T: LiveRecord> {
    items: BTreeMap<T::Key, T>,
    dropped: Option<DropReason>,
}

impl<T: LiveRecord> LiveSet<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            dropped: None,
        }
    }

    /// Fold one event into the set. Returns false once the subscription is dropped.
    pub fn apply(&mut self, event: LiveEvent<T>) -> bool {
        match event {
            LiveEvent::Snapshot(items) => {
                self.items = items.into_iter().map(|item| (item.key(), item)).collect();
            }
            LiveEvent::Upserted(item) => {
                self.items.insert(item.key(), item);
            }
            LiveEvent::Removed(item) => {
                self.items.remove(&item.key());
            }
            LiveEvent::Dropped { reason } => {
                self.dropped = Some(reason);
                return false;
            }
        }
        true
    }

    /// Apply every event already queued on `handle` without blocking.
    pub fn drain(&mut self, handle: &SubscriptionHandle<T>) -> usize {
        let mut applied = 0;
        while let Ok(event) = handle.try_recv() {
            applied += 1;
            if !self.apply(event) {
                break;
            }
        }
        applied
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in key order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn dropped(&self) -> Option<&DropReason> {
        self.dropped.as_ref()
    }
}

impl<T: LiveRecord> Default for LiveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
