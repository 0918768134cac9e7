//! Cursor tracking for one trace file.
//!
//! A cursor is a database-side reusable execution context identified by a
//! small integer in trace output. The table maps cursor numbers to the open
//! cursor mined for them, and is internally locked because parser callbacks
//! may run from separately-spawned tasks.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::record::CursorAttributes;
use super::record::CursorIdentity;
use crate::errors::CursorTableError;
use crate::errors::RecordError;
use crate::Result;

/// Performance context mined from a `PARSING IN CURSOR` trace record.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub cursor_id: i64,
    pub sql_id: String,
    pub business_tx: String,
    pub threshold_ms: i64,
    pub hash_value: String,
    pub length: i64,
    pub depth: i64,
    pub user_id: i64,
    pub lib_id: i64,
    pub command_type: i64,
}

impl Cursor {
    /// Opens a new cursor from the parsed pieces of a `PARSING IN CURSOR`
    /// record and the watch-list decision made for its SQL id.
    pub(crate) fn open(
        identity: &CursorIdentity,
        business_tx: &str,
        threshold_ms: i64,
        attributes: CursorAttributes,
    ) -> Self {
        Self {
            cursor_id: identity.cursor_id,
            sql_id: identity.sql_id.clone(),
            business_tx: business_tx.to_string(),
            threshold_ms,
            hash_value: attributes.hash_value,
            length: attributes.length,
            depth: attributes.depth,
            user_id: attributes.user_id,
            lib_id: attributes.lib_id,
            command_type: attributes.command_type,
        }
    }
}

/// Result of [`CursorTable::open_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The slot was empty; the freshly opened cursor was inserted
    Opened,
    /// A cursor is already open under this id; nothing was inserted
    AlreadyPresent,
}

/// Thread-safe cursor-number -> [`Cursor`] map with reader/writer discipline.
///
/// Invariant: at most one cursor per cursor id at any time.
#[derive(Debug, Default)]
pub struct CursorTable {
    cursors: RwLock<HashMap<i64, Cursor>>,
}

impl CursorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cursor_id: i64) -> Option<Cursor> {
        self.cursors.read().get(&cursor_id).cloned()
    }

    pub fn contains(&self, cursor_id: i64) -> bool {
        self.cursors.read().contains_key(&cursor_id)
    }

    pub fn set(&self, cursor: Cursor) {
        self.cursors.write().insert(cursor.cursor_id, cursor);
    }

    pub fn delete(&self, cursor_id: i64) {
        self.cursors.write().remove(&cursor_id);
    }

    /// Atomically checks whether a cursor is new and, if so, opens it.
    ///
    /// `open_fn` runs while the writer lock is held, so no concurrent
    /// observer can see an empty slot and race to insert. It must not call
    /// back into this table.
    pub fn open_if_absent<F>(&self, cursor_id: i64, open_fn: F) -> Result<OpenOutcome>
    where
        F: FnOnce() -> std::result::Result<Cursor, RecordError>,
    {
        let mut cursors = self.cursors.write();
        if cursors.contains_key(&cursor_id) {
            return Ok(OpenOutcome::AlreadyPresent);
        }
        let cursor = open_fn().map_err(|source| CursorTableError::Open { cursor_id, source })?;
        cursors.insert(cursor_id, cursor);
        Ok(OpenOutcome::Opened)
    }

    /// Atomically closes whatever cursor holds this id and opens a new one,
    /// under the same locking discipline as [`CursorTable::open_if_absent`].
    /// Used when a cursor number is re-used for a different SQL.
    pub fn replace<F>(&self, cursor_id: i64, open_fn: F) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<Cursor, RecordError>,
    {
        let mut cursors = self.cursors.write();
        let cursor = open_fn().map_err(|source| CursorTableError::Open { cursor_id, source })?;
        cursors.insert(cursor_id, cursor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cursors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.read().is_empty()
    }
}
