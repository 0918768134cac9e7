//! Trace Analyzer Error Hierarchy
//!
//! Defines error types for the streaming trace pipeline, categorized by
//! pipeline stage and operational concerns.

use std::num::ParseIntError;
use std::path::PathBuf;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Watch-list file loading failures
    #[error(transparent)]
    WatchList(#[from] WatchListError),

    /// Roster and trace-file IO failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed trace record; local to a single record
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Cursor-table open failures; fatal for the owning Miner
    #[error(transparent)]
    CursorTable(#[from] CursorTableError),

    /// Emission backend failures; fatal for the owning Miner
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Directory watching failures
    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failures with path context
    #[error("Path error for {path:?}")]
    PathError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Plain IO failures (seek, read, metadata)
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Roster document does not parse or serialize
    #[error("Roster document error: {0}")]
    RosterFormat(#[from] serde_json::Error),
}

/// Record-level parse failures. The Miner logs these and continues with the
/// next record; they never terminate a worker on their own.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("PARSING IN CURSOR record has {got} fields, expected at least {expected}")]
    CursorFieldCount { expected: usize, got: usize },

    #[error("PARSE/EXEC/FETCH record has {got} fields, expected at least {expected}")]
    PhaseFieldCount { expected: usize, got: usize },

    #[error("field {name} is too short to carry a value: {value:?}")]
    FieldTooShort { name: &'static str, value: String },

    #[error("cursor number is not numeric: {value:?}")]
    CursorNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("cursor attribute {name} is not numeric: {value:?}")]
    CursorAttribute {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("unknown execution phase verb: {value:?}")]
    UnknownPhase { value: String },

    #[error("timing field {name} is not numeric: {value:?}")]
    Timing {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CursorTableError {
    /// The open closure of `open_if_absent`/`replace` failed
    #[error("failed to open cursor {cursor_id}: {source}")]
    Open {
        cursor_id: i64,
        #[source]
        source: RecordError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WatchListError {
    #[error("failed to read watch list {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("watch list {path:?} line {line}: expected at least 3 columns, got {got}")]
    TooFewColumns { path: PathBuf, line: u64, got: usize },

    #[error("watch list {path:?} line {line}: threshold is not an integer: {value:?}")]
    Threshold {
        path: PathBuf,
        line: u64,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Requested output media is not a known Sink implementation
    #[error("output_type can be one of: varz. Got {0:?} instead")]
    UnknownOutputType(String),

    /// Varz metric file could not be written
    #[error("failed to write varz file {path:?}")]
    VarzWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific publish failure
    #[error("publish failed: {0}")]
    Publish(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    #[error("failed to create filesystem watcher")]
    Watcher {
        #[source]
        source: notify::Error,
    },

    #[error("failed to watch directory {path:?}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
