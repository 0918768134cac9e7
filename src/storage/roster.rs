//! Durable roster of per-file read positions.
//!
//! The roster maps a trace file's full path to its last persisted read
//! offset and format version, so that a restarted process resumes each file
//! instead of rereading it. It is persisted as a single pretty-printed JSON
//! document that round-trips exactly.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::trace_file::TraceFileState;
use crate::errors::StorageError;
use crate::utils::file_io;
use crate::Result;

/// One persisted trace-file record. Keys keep their historical on-disk
/// casing; the document must round-trip byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DirectoryName")]
    pub directory: PathBuf,
    #[serde(rename = "Version")]
    pub version: u32,
    #[serde(rename = "Offset")]
    pub offset: u64,
}

/// Mapping of trace file paths to their persisted read state.
///
/// Shared by every Miner; saves are serialized under the roster lock and the
/// on-disk document is replaced atomically, so a reader after any save sees
/// a consistent snapshot.
#[derive(Debug, Default)]
pub struct Roster {
    records: Mutex<HashMap<String, RosterRecord>>,
}

impl Roster {
    /// Loads the roster from disk. A missing file yields an empty roster;
    /// any other read or parse error surfaces.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no roster on disk, starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StorageError::PathError {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
        };

        let records: HashMap<String, RosterRecord> =
            serde_json::from_slice(&bytes).map_err(StorageError::RosterFormat)?;
        debug!(path = %path.display(), records = records.len(), "roster loaded");
        Ok(Self {
            records: Mutex::new(records),
        })
    }

    /// Opens a trace file, resuming at the persisted offset when the path is
    /// known; unknown paths start fresh at version 1, offset 0.
    pub fn open_trace(&self, full_path: &Path, records_per_batch: usize) -> Result<TraceFileState> {
        let key = roster_key(full_path);
        let known = self.records.lock().get(&key).cloned();
        match known {
            Some(record) => {
                debug!(
                    trace = %key,
                    version = record.version,
                    offset = record.offset,
                    "resuming known trace file"
                );
                TraceFileState::open(full_path, record.version, record.offset, records_per_batch)
            }
            None => {
                debug!(trace = %key, "opening new trace file");
                TraceFileState::open(full_path, 1, 0, records_per_batch)
            }
        }
    }

    /// Persists a trace file's read state: upserts the record under the
    /// roster lock, serializes the whole document and atomically replaces
    /// the file, creating the containing directory if needed.
    pub fn save(&self, path: &Path, state: &TraceFileState) -> Result<()> {
        // The lock is held across the file replacement so concurrent saves
        // cannot land their snapshots out of order.
        let mut records = self.records.lock();
        records.insert(
            roster_key(&state.full_path()),
            RosterRecord {
                name: state.name().to_string(),
                directory: state.directory().to_path_buf(),
                version: state.version(),
                offset: state.offset(),
            },
        );
        let document = serde_json::to_vec_pretty(&*records).map_err(StorageError::RosterFormat)?;
        file_io::replace_file(path, &document)?;
        debug!(
            trace = %state.name(),
            version = state.version(),
            offset = state.offset(),
            "roster saved"
        );
        Ok(())
    }

    /// The persisted record for a trace file path, if any.
    pub fn record(&self, full_path: &Path) -> Option<RosterRecord> {
        self.records.lock().get(&roster_key(full_path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Roster records are keyed by `join(DirectoryName, Name)`, i.e. the file's
/// full path as a string.
fn roster_key(full_path: &Path) -> String {
    full_path.to_string_lossy().into_owned()
}
