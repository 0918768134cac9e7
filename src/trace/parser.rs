//! Trace record state machine.
//!
//! Applies one record to the cursor table, correlating `PARSING IN CURSOR`
//! with the later `PARSE`/`EXEC`/`FETCH` stages by cursor number, and
//! computes threshold violations against the watch list.

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::cursor::Cursor;
use super::cursor::CursorTable;
use super::cursor::OpenOutcome;
use super::record;
use super::record::CursorIdentity;
use super::record::PhaseFields;
use super::record::RecordKind;
use crate::errors::RecordError;
use crate::watchlist::WatchList;
use crate::Result;

/// A threshold violation computed from one execution-stage record, carrying
/// the rolling stats of the owning business transaction as of this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub business_tx: String,
    pub threshold_ms: f64,
    pub sql_id: String,
    pub worst_ela_ms: f64,
    pub last_ela_ms: f64,
    pub num_violations: i64,
}

/// Applies one trace record.
///
/// Returns `Ok(None)` for every record that does not cross a threshold:
/// irrelevant lines, cursor-opening records, stages for unknown cursors and
/// stages below their cursor's threshold. A [`RecordError`] is local to this
/// record; the caller logs it and moves on.
pub fn apply(
    record: &str,
    watch_list: &WatchList,
    cursors: &CursorTable,
) -> Result<Option<Violation>> {
    match record::classify(record) {
        RecordKind::Invalid => {
            trace!("not a trace record of interest");
            Ok(None)
        }
        RecordKind::ParsingInCursor => parsing_in_cursor(record, watch_list, cursors),
        RecordKind::ParseExecFetch => parse_exec_fetch(record, watch_list, cursors),
    }
}

/// Handles a `PARSING IN CURSOR` record: decides whether the SQL belongs to
/// a monitored business transaction and, if so, opens (or re-opens) the
/// cursor under its number.
fn parsing_in_cursor(
    record: &str,
    watch_list: &WatchList,
    cursors: &CursorTable,
) -> Result<Option<Violation>> {
    let identity = record::parse_cursor_identity(record)?;

    let Some((business_tx, threshold_ms)) = watch_list.interesting(&identity.sql_id) else {
        debug!(sql_id = %identity.sql_id, "PARSING IN CURSOR for a SQL id not on the watch list, skipping");
        return Ok(None);
    };
    let business_tx = business_tx.to_string();
    info!(
        sql_id = %identity.sql_id,
        business_tx = %business_tx,
        threshold_ms,
        "interesting SQL found"
    );

    let outcome = cursors.open_if_absent(identity.cursor_id, || {
        open_cursor(record, &identity, &business_tx, threshold_ms)
    })?;
    match outcome {
        OpenOutcome::Opened => {
            info!(
                cursor_id = identity.cursor_id,
                sql_id = %identity.sql_id,
                business_tx = %business_tx,
                "new cursor opened"
            );
            Ok(None)
        }
        OpenOutcome::AlreadyPresent => {
            let open_sql_id = cursors.get(identity.cursor_id).map(|cursor| cursor.sql_id);
            if open_sql_id.as_deref() == Some(identity.sql_id.as_str()) {
                debug!(
                    cursor_id = identity.cursor_id,
                    sql_id = %identity.sql_id,
                    "cursor already open for this SQL, skipping"
                );
                return Ok(None);
            }

            // The cursor number was re-used for a different SQL: close the
            // stale cursor and open a fresh one in a single critical section.
            cursors.replace(identity.cursor_id, || {
                open_cursor(record, &identity, &business_tx, threshold_ms)
            })?;
            debug!(
                cursor_id = identity.cursor_id,
                sql_id = %identity.sql_id,
                business_tx = %business_tx,
                "cursor was open for a different SQL, reopened"
            );
            Ok(None)
        }
    }
}

/// Handles a `PARSE`/`EXEC`/`FETCH` record for a previously opened cursor:
/// compares the reported elapsed time against the cursor's threshold and
/// records a violation when it is crossed.
fn parse_exec_fetch(
    record: &str,
    watch_list: &WatchList,
    cursors: &CursorTable,
) -> Result<Option<Violation>> {
    let phase = PhaseFields::parse(record)?;

    let Some(cursor) = cursors.get(phase.cursor_id) else {
        debug!(
            cursor_id = phase.cursor_id,
            "execution stage for an unknown cursor, skipping"
        );
        return Ok(None);
    };

    let (cpu_us, ela_us) = phase.timings()?;
    let ela_ms = record::us_to_ms(ela_us);
    let cpu_ms = record::us_to_ms(cpu_us);
    let threshold_ms = cursor.threshold_ms as f64;

    if ela_ms < threshold_ms {
        info!(
            business_tx = %cursor.business_tx,
            sql_id = %cursor.sql_id,
            phase = %phase.phase,
            ela_ms,
            cpu_ms,
            threshold_ms,
            "ran below threshold"
        );
        return Ok(None);
    }

    warn!(
        business_tx = %cursor.business_tx,
        sql_id = %cursor.sql_id,
        phase = %phase.phase,
        ela_ms,
        cpu_ms,
        threshold_ms,
        "threshold crossed"
    );
    let stats = watch_list.record_violation(&cursor.business_tx, ela_ms);
    info!(
        last_ela_ms = stats.last_ela_ms,
        worst_ela_ms = stats.worst_ela_ms,
        num_violations = stats.num_violations,
        "violation recorded"
    );

    Ok(Some(Violation {
        business_tx: cursor.business_tx,
        threshold_ms,
        sql_id: cursor.sql_id,
        worst_ela_ms: stats.worst_ela_ms,
        last_ela_ms: stats.last_ela_ms,
        num_violations: stats.num_violations,
    }))
}

/// Builds the full cursor for a `PARSING IN CURSOR` record once its SQL has
/// been found interesting. Called from inside the cursor-table lock.
fn open_cursor(
    record: &str,
    identity: &CursorIdentity,
    business_tx: &str,
    threshold_ms: i64,
) -> std::result::Result<Cursor, RecordError> {
    let attributes = record::parse_cursor_attributes(record)?;
    Ok(Cursor::open(identity, business_tx, threshold_ms, attributes))
}
