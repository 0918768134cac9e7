//! Position-aware trace file reader.
//!
//! A trace file is an append-only text log written by one database server
//! process. The reader hands out whole LF-terminated lines and advances its
//! byte offset only by fully terminated lines, so a restart resumes at the
//! next complete line boundary.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::errors::StorageError;
use crate::Result;

/// Read state of one monitored trace file. Owned by exactly one Miner.
#[derive(Debug)]
pub struct TraceFileState {
    name: String,
    directory: PathBuf,
    /// Bumped when the file is observed to have shrunk (reused/truncated)
    version: u32,
    /// Byte position of the next unread byte
    offset: u64,
    /// Kept open to avoid reopening the file on every batch
    handle: File,
    records_per_batch: usize,
}

impl TraceFileState {
    /// Opens a trace file positioned at a known offset. Fresh files start at
    /// version 1, offset 0 (see `Roster::open_trace`).
    pub(crate) fn open(
        path: &Path,
        version: u32,
        offset: u64,
        records_per_batch: usize,
    ) -> Result<Self> {
        let handle = File::open(path).map_err(|source| StorageError::PathError {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self {
            name,
            directory,
            version,
            offset,
            handle,
            records_per_batch,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.name)
    }

    /// Reads up to `records_per_batch` newly-appended records.
    ///
    /// Each returned record is a single line including its terminating LF.
    /// A partial trailing line (no LF yet) is not returned; it is re-read
    /// after the next wake. An empty batch means nothing new.
    pub fn read_batch(&mut self) -> Result<Vec<String>> {
        self.detect_truncation()?;

        self.handle
            .seek(SeekFrom::Start(self.offset))
            .map_err(StorageError::IoError)?;
        let mut reader = BufReader::new(&mut self.handle);

        let mut records = Vec::new();
        while records.len() < self.records_per_batch {
            let mut line = Vec::new();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(StorageError::IoError)?;
            if read == 0 {
                break;
            }
            if line.last() != Some(&b'\n') {
                // Half-written line; the writer has not finished it yet.
                debug!(
                    trace = %self.name,
                    bytes = read,
                    "partial trailing line, deferring until the next wake"
                );
                break;
            }
            self.offset += read as u64;
            records.push(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(records)
    }

    /// A file shorter than the read offset has been reused or truncated:
    /// bump the version and start over from the beginning.
    fn detect_truncation(&mut self) -> Result<()> {
        let len = self.handle.metadata().map_err(StorageError::IoError)?.len();
        if len < self.offset {
            warn!(
                trace = %self.name,
                offset = self.offset,
                len,
                version = self.version,
                "trace file shrank, rereading from the start"
            );
            self.version += 1;
            self.offset = 0;
        }
        Ok(())
    }
}
