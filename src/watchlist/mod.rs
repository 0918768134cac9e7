//! The watch list: which SQL statements matter, grouped by business
//! transaction, plus the rolling violation stats per transaction.

#[cfg(test)]
mod watchlist_test;

use std::path::Path;

use dashmap::DashMap;
use tracing::debug;

use crate::errors::WatchListError;
use crate::Result;

/// One watch-list entry: a user-named business transaction, its
/// elapsed-time alerting threshold and the SQL ids that implement it.
/// Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredSql {
    pub business_tx: String,
    pub threshold_ms: i64,
    pub sql_ids: Vec<String>,
}

/// Rolling violation stats for one business transaction.
///
/// `worst_ela_ms` tracks the maximum ever seen, `last_ela_ms` the most
/// recent; `num_violations` only grows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TxStats {
    pub last_ela_ms: f64,
    pub worst_ela_ms: f64,
    pub num_violations: i64,
}

/// Ordered sequence of [`MonitoredSql`] entries, read-only after load, with
/// a lock-protected stats table keyed by business transaction so that
/// concurrent Miners can record violations without racing each other.
#[derive(Debug, Default)]
pub struct WatchList {
    entries: Vec<MonitoredSql>,
    stats: DashMap<String, TxStats>,
}

impl WatchList {
    /// Loads the watch list from its CSV-like input file.
    ///
    /// UTF-8, LF lines, `#` starts a comment line, blank lines allowed,
    /// fields comma-separated with optional double quotes, surrounding
    /// whitespace trimmed. Columns: business tx name, threshold in integer
    /// milliseconds, then one or more SQL ids.
    pub fn load(path: &Path) -> Result<Self> {
        let read_error = |source| WatchListError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(read_error)?;

        let mut entries = Vec::new();
        for result in reader.records() {
            let record = result.map_err(read_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            if record.len() < 3 {
                return Err(WatchListError::TooFewColumns {
                    path: path.to_path_buf(),
                    line,
                    got: record.len(),
                }
                .into());
            }

            let threshold = unquote(&record[1]);
            let threshold_ms =
                threshold
                    .parse::<i64>()
                    .map_err(|source| WatchListError::Threshold {
                        path: path.to_path_buf(),
                        line,
                        value: threshold.to_string(),
                        source,
                    })?;

            entries.push(MonitoredSql {
                business_tx: unquote(&record[0]).to_string(),
                threshold_ms,
                sql_ids: record.iter().skip(2).map(|id| unquote(id).to_string()).collect(),
            });
        }

        debug!(path = %path.display(), entries = entries.len(), "watch list loaded");
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<MonitoredSql>) -> Self {
        Self {
            entries,
            stats: DashMap::new(),
        }
    }

    /// Looks a SQL id up in the ordered entry list. First match wins; a SQL
    /// id is expected to occur in at most one entry (not enforced).
    pub fn interesting(&self, sql_id: &str) -> Option<(&str, i64)> {
        self.entries
            .iter()
            .find(|entry| entry.sql_ids.iter().any(|id| id == sql_id))
            .map(|entry| (entry.business_tx.as_str(), entry.threshold_ms))
    }

    /// Records one threshold violation against a business transaction and
    /// returns the updated stats. The per-key entry lock serializes
    /// concurrent updates from different Miners.
    pub fn record_violation(&self, business_tx: &str, ela_ms: f64) -> TxStats {
        let mut stats = self.stats.entry(business_tx.to_string()).or_default();
        stats.last_ela_ms = ela_ms;
        if ela_ms > stats.worst_ela_ms {
            stats.worst_ela_ms = ela_ms;
        }
        stats.num_violations += 1;
        *stats
    }

    /// Current rolling stats for a business transaction, if it has ever
    /// violated.
    pub fn stats(&self, business_tx: &str) -> Option<TxStats> {
        self.stats.get(business_tx).map(|stats| *stats)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strips one pair of surrounding double quotes. The csv reader keeps the
/// quotes literal when a quoted field is preceded by whitespace; any field
/// may optionally be quoted.
fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(field)
}
