//! The per-file worker: one Miner for every trace file.
//!
//! A Miner owns its file's read state and cursor table, streams newly
//! appended records through the trace parser and hands violations to the
//! shared sink. When caught up it persists its roster record and blocks on
//! the wake channel supplied by the Watchdog; the channel closing is the
//! shutdown signal.


use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;

use crate::sink::Sink;
use crate::sink::Summary;
use crate::storage::Roster;
use crate::storage::TraceFileState;
use crate::trace;
use crate::trace::CursorTable;
use crate::watchlist::WatchList;
use crate::Error;
use crate::Result;

pub struct Miner {
    state: TraceFileState,
    roster: Arc<Roster>,
    roster_path: PathBuf,
    watch_list: Arc<WatchList>,
    /// Cursor numbers are scoped to one server process, hence one file:
    /// every Miner tracks its own cursors
    cursors: CursorTable,
    sink: Arc<dyn Sink>,
    db_name: String,
    wake_rx: mpsc::Receiver<()>,
}

impl Miner {
    pub fn new(
        state: TraceFileState,
        roster: Arc<Roster>,
        roster_path: PathBuf,
        watch_list: Arc<WatchList>,
        sink: Arc<dyn Sink>,
        db_name: String,
        wake_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            state,
            roster,
            roster_path,
            watch_list,
            cursors: CursorTable::new(),
            sink,
            db_name,
            wake_rx,
        }
    }

    /// Reads and analyzes the trace file until the wake channel closes.
    ///
    /// A wake is delivered whenever the underlying file is written to; after
    /// any wake the loop drains to EOF, which is what makes coalesced wakes
    /// harmless. Malformed records are logged and skipped; sink, roster and
    /// cursor-open failures end this Miner (and only this Miner) with an
    /// error so the Watchdog can release the file for a later event.
    pub async fn mine(mut self) -> Result<()> {
        info!(trace = %self.state.name(), "miner started");

        loop {
            let records = self.state.read_batch()?;

            for record in &records {
                match trace::apply(record, &self.watch_list, &self.cursors) {
                    Ok(None) => {}
                    Ok(Some(violation)) => {
                        let summary = Summary::from_violation(&self.db_name, violation);
                        self.sink.publish(summary).await?;
                    }
                    Err(Error::Record(e)) => {
                        warn!(
                            trace = %self.state.name(),
                            error = %e,
                            "skipping malformed record"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            if records.is_empty() {
                self.roster.save(&self.roster_path, &self.state)?;

                if self.wake_rx.recv().await.is_none() {
                    info!(trace = %self.state.name(), "wake channel closed, miner exiting");
                    return Ok(());
                }
            }
        }
    }
}
