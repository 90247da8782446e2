//! Error handling and edge case tests.

use classbook::{
    AppointmentId, BookingError, Participant, SlotFilter, SlotId, Store, StoreConfig,
};
use std::fs;
use tempfile::TempDir;

fn test_store(dir: &TempDir) -> Store {
    Store::create(StoreConfig::at(dir.path().join("store"))).unwrap()
}

fn rao() -> Participant {
    Participant::teacher("t-rao", "Ms. Rao")
}

// --- Validation Errors ---

#[test]
fn test_create_slot_missing_fields() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    for (date, time, subject) in [
        ("", "14:00", "Algebra"),
        ("2025-07-10", "", "Algebra"),
        ("2025-07-10", "14:00", ""),
        ("2025-02-30", "14:00", "Algebra"),
        ("2025-07-10", "24:00", "Algebra"),
    ] {
        let result = store.create_slot(&rao(), date, time, subject);
        assert!(
            matches!(result, Err(BookingError::Validation(_))),
            "{:?} {:?} {:?} should be rejected",
            date,
            time,
            subject
        );
    }

    let nameless = Participant::teacher("t-rao", " ");
    assert!(store
        .create_slot(&nameless, "2025-07-10", "14:00", "Algebra")
        .unwrap_err()
        .is_validation());

    assert_eq!(store.stats().slot_count, 0);
    assert_eq!(store.stats().journal_entries, 0);
}

#[test]
fn test_range_start_after_end() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let result = store.create_slot_range(&rao(), "2025-07-10", "12:00", "10:00", "Algebra");
    assert!(matches!(result, Err(BookingError::Validation(_))));

    let zero = store.create_slot_range_with(&rao(), "2025-07-10", "10:00", "12:00", "Algebra", 0);
    assert!(matches!(zero, Err(BookingError::Validation(_))));
    assert_eq!(store.stats().slot_count, 0);
}

// --- Not Found ---

#[test]
fn test_missing_records() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    assert!(store.get_slot(SlotId(1)).is_none());
    assert!(store.get_appointment(AppointmentId(1)).is_none());

    let err = store.book_slot(SlotId(7), "s-ana", "Ana").unwrap_err();
    assert!(err.is_not_found());

    let err = store.mark_completed(&rao(), AppointmentId(7)).unwrap_err();
    assert!(matches!(err, BookingError::AppointmentNotFound(AppointmentId(7))));
}

// --- Role Checks ---

#[test]
fn test_students_cannot_run_teacher_operations() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let ana = Participant::student("s-ana", "Ana");

    let slot = store
        .create_slot(&rao(), "2025-07-10", "14:00", "Algebra")
        .unwrap();
    let id = store.book_slot(slot.id, "s-ana", "Ana").unwrap();

    assert!(matches!(
        store.create_slot(&ana, "2025-07-11", "14:00", "Algebra"),
        Err(BookingError::Forbidden(_))
    ));
    assert!(matches!(
        store.mark_completed(&ana, id),
        Err(BookingError::Forbidden(_))
    ));
    assert!(matches!(
        store.reschedule(&ana, id, "2025-07-11", "10:00"),
        Err(BookingError::Forbidden(_))
    ));
    assert!(!store.get_appointment(id).unwrap().completed);
}

// --- Conflicts ---

#[test]
fn test_booking_conflict_is_final() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let slot = store
        .create_slot(&rao(), "2025-07-10", "14:00", "Algebra")
        .unwrap();
    store.book_slot(slot.id, "s-ana", "Ana").unwrap();

    for _ in 0..3 {
        let err = store.book_slot(slot.id, "s-ben", "Ben").unwrap_err();
        assert!(err.is_conflict());
    }
    assert!(store.get_slot(slot.id).unwrap().booked);
    assert!(store.open_slots(&SlotFilter::all()).is_empty());
}

// --- Store Files ---

#[test]
fn test_corrupt_manifest() {
    let dir = TempDir::new().unwrap();
    {
        let _store = test_store(&dir);
    }
    fs::write(dir.path().join("store/MANIFEST"), b"XXXX\x01").unwrap();

    let result = Store::open(StoreConfig::at(dir.path().join("store")));
    assert!(matches!(result, Err(BookingError::InvalidFormat(_))));
}

#[test]
fn test_corrupt_journal_checksum() {
    let dir = TempDir::new().unwrap();
    {
        let store = test_store(&dir);
        store
            .create_slot(&rao(), "2025-07-10", "14:00", "Algebra")
            .unwrap();
    }

    let journal = dir.path().join("store/journal.log");
    let mut bytes = fs::read(&journal).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x55;
    fs::write(&journal, bytes).unwrap();

    let result = Store::open(StoreConfig::at(dir.path().join("store")));
    assert!(matches!(result, Err(BookingError::ChecksumMismatch { .. })));
}

#[test]
fn test_open_nonexistent_store() {
    let dir = TempDir::new().unwrap();
    let result = Store::open(StoreConfig::at(dir.path().join("missing")));
    assert!(matches!(result, Err(BookingError::Io(_))));
}
