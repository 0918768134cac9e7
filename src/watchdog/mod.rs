//! The supervisor: watches the trace directory and keeps at most one Miner
//! per trace file.
//!
//! Every filesystem event on a fresh trace file spawns a Miner; events on an
//! already-tracked file deliver a non-blocking wake to its Miner. On
//! shutdown the Watchdog closes every wake channel, which drains all Miners
//! out cleanly.


use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use notify::Event;
use notify::EventKind;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::AnalyzerConfig;
use crate::config::WatchMode;
use crate::constants::TRACE_FILE_EXT;
use crate::constants::TRACE_FILE_INFIX;
use crate::constants::WAKE_CHANNEL_CAPACITY;
use crate::errors::WatchdogError;
use crate::miner::Miner;
use crate::sink;
use crate::sink::Sink;
use crate::storage::Roster;
use crate::watchlist::WatchList;
use crate::Result;

/// Outcome of registering a filesystem event against the trace table.
pub(crate) enum TraceSlot {
    /// The file is new; the caller must spawn a Miner on this receiver
    Spawned(mpsc::Receiver<()>),
    /// A Miner already works this file; wake it through this sender
    Tracked(mpsc::Sender<()>),
}

/// Map of tracked trace files to their Miner wake channels.
///
/// Invariant: an entry is present exactly while a Miner is (or is being)
/// spawned for the file, which keeps the worker count per file at one.
#[derive(Debug, Default)]
pub(crate) struct TraceTable {
    traces: DashMap<PathBuf, mpsc::Sender<()>>,
}

impl TraceTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Double-checked insertion: a cheap read first, then the entry lock
    /// settles the race between two events for the same fresh file.
    pub(crate) fn add_or_get(&self, path: &Path) -> TraceSlot {
        if let Some(sender) = self.traces.get(path) {
            return TraceSlot::Tracked(sender.clone());
        }
        match self.traces.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => TraceSlot::Tracked(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (wake_tx, wake_rx) = mpsc::channel(WAKE_CHANNEL_CAPACITY);
                entry.insert(wake_tx);
                TraceSlot::Spawned(wake_rx)
            }
        }
    }

    pub(crate) fn remove(&self, path: &Path) {
        self.traces.remove(path);
    }

    /// Drops every wake sender; each Miner observes its channel closed and
    /// returns cleanly.
    pub(crate) fn close_all(&self) {
        self.traces.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.traces.len()
    }
}

/// Supervisor task: directory watching, Miner lifecycle, graceful shutdown.
pub struct Watchdog {
    config: Arc<AnalyzerConfig>,
    watch_list: Arc<WatchList>,
    roster: Arc<Roster>,
    sink: Arc<dyn Sink>,
    traces: Arc<TraceTable>,
    shutdown_signal: watch::Receiver<()>,
}

impl Watchdog {
    /// Instantiates the configuration-selected sink and loads the watch list
    /// and the roster. Any failure here is fatal for process startup.
    pub fn new(config: Arc<AnalyzerConfig>, shutdown_signal: watch::Receiver<()>) -> Result<Self> {
        let sink = sink::build_sink(&config)?;
        let watch_list = Arc::new(WatchList::load(&config.watch_list.path)?);
        let roster = Arc::new(Roster::load(&config.roster.path)?);

        Ok(Self {
            config,
            watch_list,
            roster,
            sink,
            traces: Arc::new(TraceTable::new()),
            shutdown_signal,
        })
    }

    /// Watches the configured directory and dispatches filesystem events
    /// until the shutdown signal fires.
    pub async fn run(&mut self) -> Result<()> {
        // Bridge notify's callback-based events into the tokio runtime.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result| {
            let _ = event_tx.send(result);
        })
        .map_err(|source| WatchdogError::Watcher { source })?;

        let dir = PathBuf::from(&self.config.trace.dir_name);
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchdogError::Watch {
                path: dir.clone(),
                source,
            })?;
        info!(directory = %dir.display(), mode = ?self.config.trace.mode, "watchdog started");

        let mut shutdown_signal = self.shutdown_signal.clone();
        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    info!("shutdown signal received, closing every miner wake channel");
                    self.traces.close_all();
                    return Ok(());
                }

                event = event_rx.recv() => match event {
                    Some(Ok(event)) => self.handle_event(&event),
                    Some(Err(e)) => warn!(error = %e, "watcher error"),
                    None => {
                        // The watcher callback is gone; nothing will ever
                        // wake a Miner again, so drain them out.
                        warn!("watcher event stream ended");
                        self.traces.close_all();
                        return Ok(());
                    }
                }
            }
        }
    }

    fn handle_event(&self, event: &Event) {
        if !self.accepts(&event.kind) {
            return;
        }
        for path in &event.paths {
            self.check_file(path);
        }
    }

    /// Event acceptance per the configured mode: `write` takes creates and
    /// modifies, `create` takes creates only.
    fn accepts(&self, kind: &EventKind) -> bool {
        match self.config.trace.mode {
            WatchMode::Write => {
                matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
            }
            WatchMode::Create => matches!(kind, EventKind::Create(_)),
        }
    }

    /// Only basenames matching `{db_name}_ora_*.trc` are trace files of the
    /// monitored database.
    fn is_trace_file(&self, path: &Path) -> bool {
        if path.extension().and_then(|ext| ext.to_str()) != Some(TRACE_FILE_EXT) {
            return false;
        }
        let Some(base) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        base.starts_with(&format!("{}{}", self.config.trace.db_name, TRACE_FILE_INFIX))
    }

    fn check_file(&self, path: &Path) {
        if !self.is_trace_file(path) {
            debug!(file = %path.display(), "not a trace file of the monitored database, skipping");
            return;
        }

        match self.traces.add_or_get(path) {
            TraceSlot::Tracked(wake_tx) => {
                // Non-blocking: a full buffer means a wake is already
                // pending, and the Miner drains to EOF after any wake.
                let _ = wake_tx.try_send(());
                debug!(file = %path.display(), "woke the existing miner");
            }
            TraceSlot::Spawned(wake_rx) => self.spawn_miner(path, wake_rx),
        }
    }

    fn spawn_miner(&self, path: &Path, wake_rx: mpsc::Receiver<()>) {
        let state = match self
            .roster
            .open_trace(path, self.config.trace.records_per_batch)
        {
            Ok(state) => state,
            Err(e) => {
                error!(file = %path.display(), error = %e, "could not open trace file, releasing it for a later event");
                self.traces.remove(path);
                return;
            }
        };

        let miner = Miner::new(
            state,
            Arc::clone(&self.roster),
            self.config.roster.path.clone(),
            Arc::clone(&self.watch_list),
            Arc::clone(&self.sink),
            self.config.trace.db_name.clone(),
            wake_rx,
        );

        // The Miner runs in the background, letting the watchdog continue.
        let traces = Arc::clone(&self.traces);
        let path = path.to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = miner.mine().await {
                // On a hiccup remove the trace from the table and let the
                // watchdog pick it up again on the next event.
                error!(trace = %path.display(), error = %e, "a hiccup in the miner");
                traces.remove(&path);
            }
        });
        debug!(active_miners = self.traces.len(), "miner spawned");
    }
}
