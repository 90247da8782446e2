//! Main Store struct tying all components together.

use crate::availability::{SlotFilter, SlotTable};
use crate::calendar::DEFAULT_GRANULARITY_MINUTES;
use crate::error::{BookingError, Result};
use crate::journal::{Journal, JournalEntry, JournalOp};
use crate::ledger::{AppointmentFilter, AppointmentTable, NoteBook, NoteFilter};
use crate::subscriptions::{Change, SubscriptionHandle, SubscriptionManager, DEFAULT_BUFFER_SIZE};
use crate::types::{Appointment, AppointmentId, Note, NoteKey, Slot, SlotId, WallTime};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Store configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base path for the store.
    pub path: PathBuf,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Keep a journal on disk. When false, nothing touches the filesystem.
    pub persist: bool,

    /// fsync the journal every N appends.
    pub sync_every: u64,

    /// Per-subscriber event buffer before the subscriber is dropped.
    pub subscription_buffer: usize,

    /// Spacing of range-created slots, minutes.
    pub slot_granularity_minutes: u32,

    /// First tick offered by the day selector.
    pub day_start: WallTime,

    /// End of the day selector (exclusive).
    pub day_end: WallTime,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./classbook"),
            create_if_missing: true,
            persist: true,
            sync_every: 1,
            subscription_buffer: DEFAULT_BUFFER_SIZE,
            slot_granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
            day_start: WallTime::from_hm(9, 0).unwrap_or_default(),
            day_end: WallTime::from_hm(21, 0).unwrap_or_default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for a store rooted at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Configuration for a purely in-memory store.
    pub fn in_memory() -> Self {
        Self {
            persist: false,
            ..Default::default()
        }
    }

    /// Parse a JSON config document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub slot_count: usize,
    pub open_slot_count: usize,
    pub appointment_count: usize,
    pub completed_count: usize,
    pub note_count: usize,
    pub subscription_count: usize,
    pub journal_entries: u64,
}

/// Magic bytes for store manifest.
const STORE_MAGIC: &[u8; 4] = b"CBK\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

const JOURNAL_FILE: &str = "journal.log";

/// The booking store.
///
/// Owns the slot, appointment and note tables, the journal and the
/// subscription broker. All mutations are serialized by `write_lock`, which
/// makes the booking compare-and-set a single-writer decision.
pub struct Store {
    /// Store configuration.
    pub(crate) config: StoreConfig,

    /// Lock file for exclusive access.
    _lock_file: Option<File>,

    /// Mutation journal (None for in-memory stores).
    journal: Option<Journal>,

    pub(crate) slots: RwLock<SlotTable>,

    pub(crate) appointments: RwLock<AppointmentTable>,

    pub(crate) notes: RwLock<NoteBook>,

    pub(crate) subscriptions: Arc<SubscriptionManager>,

    next_slot_id: AtomicU64,

    next_appointment_id: AtomicU64,

    /// Lock for write operations to ensure atomicity.
    pub(crate) write_lock: Mutex<()>,
}

impl Store {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if !config.persist {
            Ok(Self::in_memory(config))
        } else if config.path.join("MANIFEST").exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(BookingError::NotInitialized)
        }
    }

    /// Create a store that never touches disk.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::assemble(config, None, None)
    }

    /// Create a new store. Fails if one already exists at the path.
    pub fn create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        for existing in ["MANIFEST", JOURNAL_FILE] {
            let path = config.path.join(existing);
            if path.exists() {
                return Err(BookingError::AlreadyExists(path.display().to_string()));
            }
        }
        Self::write_manifest(&config.path)?;

        let (journal, _) = Journal::open(config.path.join(JOURNAL_FILE), config.sync_every)?;

        info!(path = %config.path.display(), "created store");
        Ok(Self::assemble(config, Some(lock_file), Some(journal)))
    }

    /// Open an existing store, replaying its journal.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;
        let (journal, entries) = Journal::open(config.path.join(JOURNAL_FILE), config.sync_every)?;

        let store = Self::assemble(config, Some(lock_file), Some(journal));
        let replayed = entries.len();
        store.replay(entries)?;

        info!(
            path = %store.config.path.display(),
            entries = replayed,
            slots = store.slots.read().len(),
            appointments = store.appointments.read().len(),
            "opened store"
        );
        Ok(store)
    }

    fn assemble(config: StoreConfig, lock_file: Option<File>, journal: Option<Journal>) -> Self {
        let subscriptions = Arc::new(SubscriptionManager::with_buffer_size(
            config.subscription_buffer,
        ));
        Self {
            config,
            _lock_file: lock_file,
            journal,
            slots: RwLock::new(SlotTable::new()),
            appointments: RwLock::new(AppointmentTable::new()),
            notes: RwLock::new(NoteBook::new()),
            subscriptions,
            next_slot_id: AtomicU64::new(1),
            next_appointment_id: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Rebuild tables from journal entries and resume id allocation.
    fn replay(&self, entries: Vec<JournalEntry>) -> Result<()> {
        let mut slots = self.slots.write();
        let mut appointments = self.appointments.write();
        let mut notes = self.notes.write();
        let mut highest_slot = 0;

        for entry in entries {
            let seq = entry.seq;
            let corrupt =
                |what: String| BookingError::Corruption(format!("journal entry {}: {}", seq, what));
            match entry.op {
                JournalOp::SlotCreated(slot) => {
                    highest_slot = highest_slot.max(slot.id.0);
                    slots.insert(slot);
                }
                JournalOp::SlotDeleted { slot_id } => {
                    slots
                        .remove_unbooked(slot_id)
                        .map_err(|e| corrupt(e.to_string()))?;
                }
                JournalOp::SlotBooked {
                    slot_id,
                    appointment,
                } => {
                    slots
                        .mark_booked(slot_id)
                        .map_err(|e| corrupt(e.to_string()))?;
                    appointments.put(appointment);
                }
                JournalOp::AppointmentUpdated(appointment) => {
                    if appointments.get(appointment.id).is_none() {
                        return Err(corrupt(format!(
                            "update for unknown appointment {}",
                            appointment.id
                        )));
                    }
                    appointments.put(appointment);
                }
                JournalOp::NoteSaved(note) => {
                    notes.upsert(note);
                }
            }
        }

        // Deleted slots are gone from the table but their ids stay retired.
        let next_slot = highest_slot.max(slots.max_id().map(|id| id.0).unwrap_or(0)) + 1;
        let next_appointment = appointments.max_id().map(|id| id.0 + 1).unwrap_or(1);
        self.next_slot_id.store(next_slot, Ordering::SeqCst);
        self.next_appointment_id
            .store(next_appointment, Ordering::SeqCst);
        Ok(())
    }

    // --- Commit helpers (callers hold write_lock) ---

    pub(crate) fn allocate_slot_id(&self) -> SlotId {
        SlotId(self.next_slot_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn allocate_appointment_id(&self) -> AppointmentId {
        AppointmentId(self.next_appointment_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Record `op` durably before it is applied in memory.
    pub(crate) fn journal(&self, op: JournalOp) -> Result<()> {
        if let Some(ref journal) = self.journal {
            let seq = journal.append(&op)?;
            debug!(seq, "journaled mutation");
        }
        Ok(())
    }

    pub(crate) fn publish(&self, changes: &[Change]) {
        self.subscriptions.publish(changes);
    }

    // --- Point-in-time reads ---

    pub fn get_slot(&self, id: SlotId) -> Option<Slot> {
        self.slots.read().get(id).cloned()
    }

    /// Unbooked slots matching `filter`, ordered by date and time.
    pub fn open_slots(&self, filter: &SlotFilter) -> Vec<Slot> {
        self.slots.read().open_slots(filter)
    }

    pub fn get_appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.read().get(id).cloned()
    }

    pub fn appointments(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        self.appointments.read().query(filter)
    }

    pub fn note(&self, key: NoteKey) -> Option<Note> {
        self.notes.read().get(&key).cloned()
    }

    pub fn notes(&self, filter: &NoteFilter) -> Vec<Note> {
        self.notes.read().query(filter)
    }

    /// Note history for one subject with one counterpart, across appointments.
    pub fn note_history(&self, subject: &str, counterpart_name: &str) -> Vec<Note> {
        self.notes.read().history(subject, counterpart_name)
    }

    // --- Live queries ---

    /// Live view of unbooked slots. Restart by subscribing again.
    pub fn list_open_slots(&self, filter: SlotFilter) -> SubscriptionHandle<Slot> {
        let _lock = self.write_lock.lock();
        let snapshot = self.slots.read().open_slots(&filter);
        self.subscriptions.subscribe_open_slots(filter, snapshot)
    }

    /// Live view of appointments matching `filter`.
    pub fn list_appointments(&self, filter: AppointmentFilter) -> SubscriptionHandle<Appointment> {
        let _lock = self.write_lock.lock();
        let snapshot = self.appointments.read().query(&filter);
        self.subscriptions.subscribe_appointments(filter, snapshot)
    }

    /// Live view of notes matching `filter`.
    pub fn list_notes(&self, filter: NoteFilter) -> SubscriptionHandle<Note> {
        let _lock = self.write_lock.lock();
        let snapshot = self.notes.read().query(&filter);
        self.subscriptions.subscribe_notes(filter, snapshot)
    }

    // --- Utility ---

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn stats(&self) -> StoreStats {
        let slots = self.slots.read();
        let appointments = self.appointments.read();
        StoreStats {
            slot_count: slots.len(),
            open_slot_count: slots.open_count(),
            appointment_count: appointments.len(),
            completed_count: appointments.completed_count(),
            note_count: self.notes.read().len(),
            subscription_count: self.subscriptions.subscription_count(),
            journal_entries: self.journal.as_ref().map(|j| j.len()).unwrap_or(0),
        }
    }

    /// Sync the journal to disk.
    pub fn sync(&self) -> Result<()> {
        match self.journal {
            Some(ref journal) => journal.sync(),
            None => Ok(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.journal.as_ref().map(|_| self.config.path.as_path())
    }

    // --- Private Helpers ---

    fn write_manifest(path: &Path) -> Result<()> {
        use std::io::Write;

        let manifest_path = path.join("MANIFEST");
        let mut file = File::create(manifest_path)?;

        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        use std::io::Read;

        let manifest_path = path.join("MANIFEST");
        let mut file = File::open(manifest_path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(BookingError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(BookingError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| BookingError::Locked)?;

        Ok(lock_file)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.subscriptions.close_all();
        // Best-effort sync on drop
        let _ = self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Participant;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> StoreConfig {
        StoreConfig::at(dir.path().join("store"))
    }

    fn teacher() -> Participant {
        Participant::teacher("t1", "Ms. Rao")
    }

    #[test]
    fn test_create_store() {
        let dir = TempDir::new().unwrap();
        let store = Store::create(test_config(&dir)).unwrap();

        assert_eq!(store.stats(), StoreStats::default());
        assert!(dir.path().join("store/MANIFEST").exists());
        assert!(store.path().is_some());
    }

    #[test]
    fn test_store_lock() {
        let dir = TempDir::new().unwrap();
        let _store = Store::create(test_config(&dir)).unwrap();

        let second = Store::open(test_config(&dir));
        assert!(matches!(second, Err(BookingError::Locked)));
    }

    #[test]
    fn test_open_missing_without_create() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            create_if_missing: false,
            ..test_config(&dir)
        };
        assert!(matches!(
            Store::open_or_create(config),
            Err(BookingError::NotInitialized)
        ));
    }

    #[test]
    fn test_in_memory_store_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            persist: false,
            ..test_config(&dir)
        };
        let store = Store::open_or_create(config).unwrap();
        store
            .create_slot(&teacher(), "2025-06-01", "10:00", "Algebra")
            .unwrap();

        assert!(!dir.path().join("store").exists());
        assert_eq!(store.stats().journal_entries, 0);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_persistence_resumes_ids() {
        let dir = TempDir::new().unwrap();

        {
            let store = Store::create(test_config(&dir)).unwrap();
            let first = store
                .create_slot(&teacher(), "2025-06-01", "10:00", "Algebra")
                .unwrap();
            let second = store
                .create_slot(&teacher(), "2025-06-01", "10:30", "Algebra")
                .unwrap();
            store.delete_slot(&teacher(), second.id).unwrap();
            store.book_slot(first.id, "s1", "Ana").unwrap();
        }

        let store = Store::open(test_config(&dir)).unwrap();
        let stats = store.stats();
        assert_eq!(stats.slot_count, 1);
        assert_eq!(stats.open_slot_count, 0);
        assert_eq!(stats.appointment_count, 1);
        assert_eq!(stats.journal_entries, 4);

        // Slot 2 was deleted; its id is not reused.
        let next = store
            .create_slot(&teacher(), "2025-06-02", "10:00", "Algebra")
            .unwrap();
        assert_eq!(next.id, SlotId(3));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{"path": "/tmp/cb", "slot_granularity_minutes": 15, "day_start": "08:00"}"#;
        let config = StoreConfig::from_json(json).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/cb"));
        assert_eq!(config.slot_granularity_minutes, 15);
        assert_eq!(config.day_start.to_string(), "08:00");
        assert_eq!(config.day_end.to_string(), "21:00");
        assert!(config.persist);

        assert!(matches!(
            StoreConfig::from_json(r#"{"day_end": "late"}"#),
            Err(BookingError::Deserialization(_))
        ));
    }
}
