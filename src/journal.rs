//! Append-only journal of committed mutations.
//!
//! Every mutation is written here before it is applied in memory. On open,
//! the journal is replayed to rebuild the slot, appointment and note tables.
//!
//! Frame layout: `len: u32 LE | rmp-serde entry | crc32: u32 LE`.

use crate::error::{BookingError, Result};
use crate::types::{Appointment, Note, Slot, SlotId, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

/// Magic bytes for the journal file.
const JOURNAL_MAGIC: &[u8; 4] = b"CBJ\0";

/// Current journal format version.
const JOURNAL_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;

/// Sanity limit on a single frame.
const MAX_ENTRY_BYTES: usize = 16 * 1024 * 1024;

/// A committed mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JournalOp {
    SlotCreated(Slot),
    SlotDeleted { slot_id: SlotId },
    /// Slot flip and appointment creation, recorded as one entry.
    SlotBooked { slot_id: SlotId, appointment: Appointment },
    /// Full after-image of an appointment.
    AppointmentUpdated(Appointment),
    NoteSaved(Note),
}

/// A single journal entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub op: JournalOp,
}

struct Writer {
    file: File,
    /// File length up to the end of the last complete frame.
    committed_len: u64,
    next_seq: u64,
    writes_since_sync: u64,
    /// A failed append could not be cut back; the tail is untrustworthy.
    poisoned: bool,
}

impl Writer {
    /// Write one whole frame, optionally syncing. On failure the file is cut
    /// back to `committed_len`.
    fn write_frame(&mut self, frame: &[u8], sync: bool) -> Result<()> {
        let written = self.file.write_all(frame).and_then(|()| {
            if sync {
                self.file.sync_all()
            } else {
                Ok(())
            }
        });

        match written {
            Ok(()) => {
                self.committed_len += frame.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e.into())
            }
        }
    }

    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.committed_len) {
            warn!(error = %e, "could not cut back failed journal append");
            self.poisoned = true;
        }
    }
}

/// Journal file handle.
pub struct Journal {
    writer: Mutex<Writer>,
    /// fsync every N appends (1 = every append).
    sync_every: u64,
}

impl Journal {
    /// Open or create the journal at `path`, returning the entries to replay.
    ///
    /// A torn final frame (crash mid-append) is cut off; a checksum failure on
    /// a complete frame is reported as corruption.
    pub fn open(path: impl AsRef<Path>, sync_every: u64) -> Result<(Self, Vec<JournalEntry>)> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let mut bytes = Vec::new();
            File::open(&path)?.read_to_end(&mut bytes)?;
            Self::verify_header(&bytes)?;

            let (entries, valid_len) = decode_frames(&bytes[HEADER_LEN..])?;
            let valid_len = (HEADER_LEN + valid_len) as u64;
            if valid_len < bytes.len() as u64 {
                warn!(
                    path = %path.display(),
                    dropped_bytes = bytes.len() as u64 - valid_len,
                    "truncating torn journal tail"
                );
                OpenOptions::new().write(true).open(&path)?.set_len(valid_len)?;
            }
            entries
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            file.write_all(JOURNAL_MAGIC)?;
            file.write_all(&[JOURNAL_VERSION])?;
            file.sync_all()?;
            Vec::new()
        };

        let next_seq = entries.last().map(|e| e.seq + 1).unwrap_or(1);
        let file = OpenOptions::new().append(true).open(&path)?;
        let committed_len = file.metadata()?.len();

        let journal = Self {
            writer: Mutex::new(Writer {
                file,
                committed_len,
                next_seq,
                writes_since_sync: 0,
                poisoned: false,
            }),
            sync_every: sync_every.max(1),
        };
        Ok((journal, entries))
    }

    /// Append an operation. Returns its sequence number.
    ///
    /// The frame reaches the OS in one write before returning. If the write
    /// fails, the file is cut back and the sequence number is not consumed.
    pub fn append(&self, op: &JournalOp) -> Result<u64> {
        let mut writer = self.writer.lock();
        if writer.poisoned {
            return Err(BookingError::Corruption(
                "journal tail holds a failed partial write".into(),
            ));
        }
        let seq = writer.next_seq;

        let entry = JournalEntry {
            seq,
            timestamp: Timestamp::now(),
            op: op.clone(),
        };
        let frame = encode_frame(&entry)?;

        let sync = writer.writes_since_sync + 1 >= self.sync_every;
        writer.write_frame(&frame, sync)?;

        writer.next_seq += 1;
        writer.writes_since_sync = if sync { 0 } else { writer.writes_since_sync + 1 };
        Ok(seq)
    }

    /// Force pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.file.sync_all()?;
        writer.writes_since_sync = 0;
        Ok(())
    }

    /// Number of entries written so far (including replayed ones).
    pub fn len(&self) -> u64 {
        self.writer.lock().next_seq - 1
    }

    fn verify_header(bytes: &[u8]) -> Result<()> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != JOURNAL_MAGIC {
            return Err(BookingError::InvalidFormat("Invalid journal magic".into()));
        }
        if bytes[4] != JOURNAL_VERSION {
            return Err(BookingError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                bytes[4]
            )));
        }
        Ok(())
    }
}

fn encode_frame(entry: &JournalEntry) -> Result<Vec<u8>> {
    let encoded = rmp_serde::to_vec(entry)?;
    let mut frame = Vec::with_capacity(encoded.len() + 8);
    frame.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    frame.extend_from_slice(&encoded);
    frame.extend_from_slice(&crc32fast::hash(&encoded).to_le_bytes());
    Ok(frame)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// Decode complete frames. Returns the entries and the byte length they span.
fn decode_frames(bytes: &[u8]) -> Result<(Vec<JournalEntry>, usize)> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while bytes.len() - offset >= 4 {
        let rest = &bytes[offset..];
        let len = read_u32(rest) as usize;
        if len > MAX_ENTRY_BYTES {
            return Err(BookingError::Corruption(format!(
                "journal frame at offset {} claims {} bytes",
                offset, len
            )));
        }

        let frame_len = 4 + len + 4;
        if rest.len() < frame_len {
            break;
        }

        let payload = &rest[4..4 + len];
        let expected = read_u32(&rest[4 + len..]);
        let got = crc32fast::hash(payload);
        if expected != got {
            return Err(BookingError::ChecksumMismatch { expected, got });
        }

        entries.push(rmp_serde::from_slice(payload)?);
        offset += frame_len;
    }

    Ok((entries, offset))
}
