//! Trace record lexer.
//!
//! Classifies one LF-terminated trace file line and extracts its fields.
//! The terminator is accounted for by the reader; it is stripped here before
//! any field work.

use std::fmt;

use crate::errors::RecordError;

const PARSING_IN_CURSOR_PREFIX: &str = "PARSING IN CURSOR";
const SQLID_MARKER: &str = "sqlid";

/// A `PARSING IN CURSOR` record carries at least this many
/// whitespace-separated fields.
const MIN_CURSOR_FIELDS: usize = 13;
/// A `PARSE`/`EXEC`/`FETCH` record carries at least this many fields after
/// splitting on the separator set.
const MIN_PHASE_FIELDS: usize = 6;

const PHASE_SEPARATORS: [char; 5] = ['#', ':', ',', '=', ' '];

/// Which of the relevant trace record forms a line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Not a trace line of interest; silently ignored
    Invalid,
    /// Initial cursor parsing; opens a cursor in the tracker
    ParsingInCursor,
    /// A PARSE, EXEC or FETCH cursor execution stage
    ParseExecFetch,
}

/// Classifies one record.
///
/// A line is `ParsingInCursor` iff it begins with `PARSING IN CURSOR` and
/// mentions a sqlid; `ParseExecFetch` iff it begins with one of the three
/// execution-stage verbs.
pub fn classify(record: &str) -> RecordKind {
    let record = strip_terminator(record);
    if record.starts_with(PARSING_IN_CURSOR_PREFIX) && record.contains(SQLID_MARKER) {
        return RecordKind::ParsingInCursor;
    }
    if record.starts_with("PARSE #") || record.starts_with("EXEC #") || record.starts_with("FETCH #")
    {
        return RecordKind::ParseExecFetch;
    }
    RecordKind::Invalid
}

/// The minimal parse of a `PARSING IN CURSOR` record: enough to decide
/// whether the SQL is of interest before paying for the full attribute parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorIdentity {
    pub sql_id: String,
    pub cursor_id: i64,
}

pub fn parse_cursor_identity(record: &str) -> Result<CursorIdentity, RecordError> {
    let fields = cursor_fields(record)?;

    // sqlid='abc' -> abc (the value starts after `sqlid='`; up to two quotes
    // are removed)
    let sql_id = value_at(fields[12], 7, "sqlid")?.replacen('\'', "", 2);

    let cursor = value_at(fields[3], 1, "cursor#")?;
    let cursor_id = cursor
        .parse::<i64>()
        .map_err(|source| RecordError::CursorNumber {
            value: cursor.to_string(),
            source,
        })?;

    Ok(CursorIdentity { sql_id, cursor_id })
}

/// The remaining cursor attributes of a `PARSING IN CURSOR` record.
///
/// `hash_value` is the SQL hash value, `length` the statement text length in
/// bytes, `depth` the recursive call depth, `user_id` the parsing user,
/// `lib_id` the parsing schema and `command_type` Oracle's command type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorAttributes {
    pub hash_value: String,
    pub length: i64,
    pub depth: i64,
    pub user_id: i64,
    pub lib_id: i64,
    pub command_type: i64,
}

pub fn parse_cursor_attributes(record: &str) -> Result<CursorAttributes, RecordError> {
    let fields = cursor_fields(record)?;

    Ok(CursorAttributes {
        hash_value: value_at(fields[10], 3, "hv")?.to_string(),
        length: attribute(fields[4], "len")?,
        depth: attribute(fields[5], "dep")?,
        user_id: attribute(fields[6], "uid")?,
        command_type: attribute(fields[7], "oct")?,
        lib_id: attribute(fields[8], "lid")?,
    })
}

/// Cursor execution stage of a `ParseExecFetch` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Exec,
    Fetch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parse => write!(f, "PARSE"),
            Phase::Exec => write!(f, "EXEC"),
            Phase::Fetch => write!(f, "FETCH"),
        }
    }
}

/// A split `PARSE`/`EXEC`/`FETCH` record.
///
/// The verb and cursor number parse eagerly; the timing fields parse on
/// demand via [`PhaseFields::timings`], so that a record for an unknown
/// cursor never pays for (or trips over) its timing fields.
#[derive(Debug)]
pub struct PhaseFields<'a> {
    pub phase: Phase,
    pub cursor_id: i64,
    fields: Vec<&'a str>,
}

impl<'a> PhaseFields<'a> {
    pub fn parse(record: &'a str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = strip_terminator(record)
            .split(&PHASE_SEPARATORS[..])
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() < MIN_PHASE_FIELDS {
            return Err(RecordError::PhaseFieldCount {
                expected: MIN_PHASE_FIELDS,
                got: fields.len(),
            });
        }

        let phase = match fields[0] {
            "PARSE" => Phase::Parse,
            "EXEC" => Phase::Exec,
            "FETCH" => Phase::Fetch,
            other => {
                return Err(RecordError::UnknownPhase {
                    value: other.to_string(),
                })
            }
        };

        let cursor_id = fields[1]
            .parse::<i64>()
            .map_err(|source| RecordError::CursorNumber {
                value: fields[1].to_string(),
                source,
            })?;

        Ok(Self {
            phase,
            cursor_id,
            fields,
        })
    }

    /// CPU and elapsed time in microseconds, as reported by the record.
    pub fn timings(&self) -> Result<(i64, i64), RecordError> {
        let cpu_us = timing(self.fields[3], "cpu")?;
        let ela_us = timing(self.fields[5], "ela")?;
        Ok((cpu_us, ela_us))
    }
}

/// Microseconds to milliseconds, the unit thresholds are declared in.
pub fn us_to_ms(us: i64) -> f64 {
    us as f64 / 1000.0
}

fn strip_terminator(record: &str) -> &str {
    record.strip_suffix('\n').unwrap_or(record)
}

fn cursor_fields(record: &str) -> Result<Vec<&str>, RecordError> {
    let fields: Vec<&str> = strip_terminator(record).split_whitespace().collect();
    if fields.len() < MIN_CURSOR_FIELDS {
        return Err(RecordError::CursorFieldCount {
            expected: MIN_CURSOR_FIELDS,
            got: fields.len(),
        });
    }
    Ok(fields)
}

/// The value portion of a field whose tag has a fixed width, e.g. `hv=99`
/// at offset 3.
fn value_at<'a>(field: &'a str, at: usize, name: &'static str) -> Result<&'a str, RecordError> {
    field.get(at..).ok_or_else(|| RecordError::FieldTooShort {
        name,
        value: field.to_string(),
    })
}

/// A `key=value` cursor attribute with a 3-character key, e.g. `len=120`.
fn attribute(field: &str, name: &'static str) -> Result<i64, RecordError> {
    let value = value_at(field, 4, name)?;
    value
        .parse::<i64>()
        .map_err(|source| RecordError::CursorAttribute {
            name,
            value: value.to_string(),
            source,
        })
}

fn timing(field: &str, name: &'static str) -> Result<i64, RecordError> {
    field.parse::<i64>().map_err(|source| RecordError::Timing {
        name,
        value: field.to_string(),
        source,
    })
}
