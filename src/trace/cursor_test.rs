use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::*;
use crate::errors::RecordError;
use crate::Error;

fn cursor(cursor_id: i64, sql_id: &str) -> Cursor {
    Cursor {
        cursor_id,
        sql_id: sql_id.to_string(),
        business_tx: "OE".to_string(),
        threshold_ms: 1,
        hash_value: "99".to_string(),
        length: 120,
        depth: 0,
        user_id: 0,
        lib_id: 0,
        command_type: 3,
    }
}

#[test]
fn test_open_if_absent_opens_new_cursor() {
    let table = CursorTable::new();
    let outcome = table.open_if_absent(17, || Ok(cursor(17, "abc"))).unwrap();
    assert_eq!(outcome, OpenOutcome::Opened);
    assert!(table.contains(17));
    assert_eq!(table.get(17).unwrap().sql_id, "abc");
}

#[test]
fn test_open_if_absent_keeps_existing_cursor() {
    let table = CursorTable::new();
    table.set(cursor(17, "abc"));

    let outcome = table
        .open_if_absent(17, || panic!("open_fn must not run for a present key"))
        .unwrap();
    assert_eq!(outcome, OpenOutcome::AlreadyPresent);
    assert_eq!(table.get(17).unwrap().sql_id, "abc");
}

#[test]
fn test_open_if_absent_propagates_open_error() {
    let table = CursorTable::new();
    let e = table
        .open_if_absent(17, || {
            Err(RecordError::FieldTooShort {
                name: "hv",
                value: "hv".to_string(),
            })
        })
        .unwrap_err();
    assert!(matches!(e, Error::CursorTable(_)));
    // A failed open leaves no slot behind.
    assert!(!table.contains(17));
}

#[test]
fn test_replace_swaps_cursor() {
    let table = CursorTable::new();
    table.set(cursor(17, "abc"));

    table.replace(17, || Ok(cursor(17, "def"))).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(17).unwrap().sql_id, "def");
}

#[test]
fn test_replace_open_error_keeps_existing() {
    let table = CursorTable::new();
    table.set(cursor(17, "abc"));

    let e = table
        .replace(17, || {
            Err(RecordError::FieldTooShort {
                name: "hv",
                value: "hv".to_string(),
            })
        })
        .unwrap_err();
    assert!(matches!(e, Error::CursorTable(_)));
    assert_eq!(table.get(17).unwrap().sql_id, "abc");
}

#[test]
fn test_delete() {
    let table = CursorTable::new();
    table.set(cursor(17, "abc"));
    table.delete(17);
    assert!(!table.contains(17));
    assert!(table.is_empty());
}

#[test]
fn test_get_unknown_cursor() {
    let table = CursorTable::new();
    assert_eq!(table.get(99), None);
}

/// Racing opens for the same cursor id must produce exactly one insertion.
#[test]
fn test_concurrent_open_if_absent_is_atomic() {
    let table = Arc::new(CursorTable::new());
    let opened = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let table = Arc::clone(&table);
            let opened = Arc::clone(&opened);
            std::thread::spawn(move || {
                let outcome = table.open_if_absent(17, || Ok(cursor(17, "abc"))).unwrap();
                if outcome == OpenOutcome::Opened {
                    opened.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(table.len(), 1);
}
