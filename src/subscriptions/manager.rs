//! Subscription manager for broadcasting store changes.

use crate::availability::SlotFilter;
use crate::ledger::{AppointmentFilter, NoteFilter};
use crate::types::{Appointment, Note, Slot};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::types::{DropReason, LiveEvent, LiveRecord, SubscriptionHandle, SubscriptionId};

/// Default per-subscriber buffer (events).
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// One committed mutation, as seen by the broker.
#[derive(Clone, Debug)]
pub enum Change {
    Slot {
        before: Option<Slot>,
        after: Option<Slot>,
    },
    Appointment {
        before: Option<Appointment>,
        after: Option<Appointment>,
    },
    Note {
        before: Option<Note>,
        after: Option<Note>,
    },
}

/// What a subscription is watching, and where to send it.
enum Query {
    OpenSlots {
        filter: SlotFilter,
        sender: Sender<LiveEvent<Slot>>,
    },
    Appointments {
        filter: AppointmentFilter,
        sender: Sender<LiveEvent<Appointment>>,
    },
    Notes {
        filter: NoteFilter,
        sender: Sender<LiveEvent<Note>>,
    },
}

/// Internal subscription state.
struct Subscription {
    query: Query,
}

impl Subscription {
    /// Deliver the subscriber's view of `change`. Returns false if the buffer is
    /// full or the receiver is gone (subscriber will be dropped).
    ///
    /// Data events may fill at most `limit` entries; the channel keeps one more
    /// for the final `Dropped` notice.
    fn deliver(&self, change: &Change, limit: usize) -> bool {
        match (&self.query, change) {
            (Query::OpenSlots { filter, sender }, Change::Slot { before, after }) => {
                try_send(sender, limit, delta(|s| filter.matches(s), before, after))
            }
            (Query::Appointments { filter, sender }, Change::Appointment { before, after }) => {
                try_send(sender, limit, delta(|a| filter.matches(a), before, after))
            }
            (Query::Notes { filter, sender }, Change::Note { before, after }) => {
                try_send(sender, limit, delta(|n| filter.matches(n), before, after))
            }
            _ => true,
        }
    }

    /// Best-effort final notice.
    fn notify_dropped(&self, reason: DropReason) {
        match &self.query {
            Query::OpenSlots { sender, .. } => {
                let _ = sender.try_send(LiveEvent::Dropped { reason });
            }
            Query::Appointments { sender, .. } => {
                let _ = sender.try_send(LiveEvent::Dropped { reason });
            }
            Query::Notes { sender, .. } => {
                let _ = sender.try_send(LiveEvent::Dropped { reason });
            }
        }
    }
}

/// Translate a before/after pair into the event one filter should observe.
fn delta<T, F>(matches: F, before: &Option<T>, after: &Option<T>) -> Option<LiveEvent<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let was = before.as_ref().is_some_and(&matches);
    let is = after.as_ref().is_some_and(&matches);
    match (was, is, before, after) {
        (_, true, _, Some(item)) => Some(LiveEvent::Upserted(item.clone())),
        (true, false, Some(item), _) => Some(LiveEvent::Removed(item.clone())),
        _ => None,
    }
}

fn try_send<T>(
    sender: &Sender<LiveEvent<T>>,
    limit: usize,
    event: Option<LiveEvent<T>>,
) -> bool {
    match event {
        None => true,
        Some(_) if sender.len() >= limit => false,
        Some(event) => match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => false,
        },
    }
}

/// Manages subscriptions and broadcasts changes.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Per-subscriber channel capacity.
    buffer_size: usize,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new subscription manager with a custom per-subscriber buffer.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            // The snapshot always needs one slot.
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn subscribe_open_slots(
        self: &Arc<Self>,
        filter: SlotFilter,
        snapshot: Vec<Slot>,
    ) -> SubscriptionHandle<Slot> {
        self.register(snapshot, |sender| Query::OpenSlots { filter, sender })
    }

    pub fn subscribe_appointments(
        self: &Arc<Self>,
        filter: AppointmentFilter,
        snapshot: Vec<Appointment>,
    ) -> SubscriptionHandle<Appointment> {
        self.register(snapshot, |sender| Query::Appointments { filter, sender })
    }

    pub fn subscribe_notes(
        self: &Arc<Self>,
        filter: NoteFilter,
        snapshot: Vec<Note>,
    ) -> SubscriptionHandle<Note> {
        self.register(snapshot, |sender| Query::Notes { filter, sender })
    }

    /// Register a subscription whose first event is `snapshot`.
    ///
    /// Callers must hold the store's write lock so that no change is published
    /// between taking the snapshot and registering.
    fn register<T, F>(self: &Arc<Self>, snapshot: Vec<T>, make_query: F) -> SubscriptionHandle<T>
    where
        T: LiveRecord,
        F: FnOnce(Sender<LiveEvent<T>>) -> Query,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size + 1);

        // Fresh channel with capacity >= 1: cannot fail.
        let _ = sender.try_send(LiveEvent::Snapshot(snapshot));

        let subscription = Subscription {
            query: make_query(sender),
        };
        self.subscriptions.write().insert(id, subscription);

        SubscriptionHandle::new(id, receiver, Arc::downgrade(self))
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.write().remove(&id);
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.read().contains_key(&id)
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Drop every subscriber, telling each one the store is gone.
    pub fn close_all(&self) {
        let mut subs = self.subscriptions.write();
        for (_, sub) in subs.drain() {
            sub.notify_dropped(DropReason::StoreClosed);
        }
    }

    // --- Broadcasting ---

    /// Publish committed changes to every matching subscription.
    ///
    /// All changes of one mutation are delivered in a single pass, so a
    /// subscriber never observes half of a booking.
    pub fn publish(&self, changes: &[Change]) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if !changes
                    .iter()
                    .all(|change| sub.deliver(change, self.buffer_size))
                {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, "dropping slow or disconnected subscriber");
                    sub.notify_dropped(DropReason::BufferOverflow);
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
