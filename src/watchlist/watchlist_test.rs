use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;

use super::*;
use crate::Error;

fn write_watch_list(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rtta.sqlinput");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

#[test]
fn test_load() {
    let (_dir, path) = write_watch_list(
        "# business tx, threshold [ms], sql ids\n\
         \"Order Entry\", 10, abc123, def456\n\
         \n\
         GL, 5, \"ghi789\"\n",
    );
    let watch_list = WatchList::load(&path).unwrap();

    assert_eq!(watch_list.len(), 2);
    assert_eq!(watch_list.interesting("abc123"), Some(("Order Entry", 10)));
    assert_eq!(watch_list.interesting("def456"), Some(("Order Entry", 10)));
    assert_eq!(watch_list.interesting("ghi789"), Some(("GL", 5)));
    assert_eq!(watch_list.interesting("nope"), None);
}

#[test]
fn test_load_trims_leading_whitespace() {
    let (_dir, path) = write_watch_list("OE,   1,   abc\n");
    let watch_list = WatchList::load(&path).unwrap();
    assert_eq!(watch_list.interesting("abc"), Some(("OE", 1)));
}

#[test]
fn test_load_rejects_too_few_columns() {
    let (_dir, path) = write_watch_list("OE, 1\n");
    let e = WatchList::load(&path).unwrap_err();
    assert!(matches!(
        e,
        Error::WatchList(crate::WatchListError::TooFewColumns { got: 2, .. })
    ));
}

#[test]
fn test_load_rejects_non_numeric_threshold() {
    let (_dir, path) = write_watch_list("OE, fast, abc\n");
    let e = WatchList::load(&path).unwrap_err();
    assert!(matches!(
        e,
        Error::WatchList(crate::WatchListError::Threshold { .. })
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let e = WatchList::load(&dir.path().join("absent.sqlinput")).unwrap_err();
    assert!(matches!(
        e,
        Error::WatchList(crate::WatchListError::Read { .. })
    ));
}

#[test]
fn test_first_match_wins_on_duplicate_sql_id() {
    let (_dir, path) = write_watch_list(
        "OE, 1, abc\n\
         GL, 10, abc\n",
    );
    let watch_list = WatchList::load(&path).unwrap();
    assert_eq!(watch_list.interesting("abc"), Some(("OE", 1)));
}

#[test]
fn test_record_violation_rolls_stats() {
    let watch_list = WatchList::from_entries(vec![MonitoredSql {
        business_tx: "OE".to_string(),
        threshold_ms: 1,
        sql_ids: vec!["abc".to_string()],
    }]);

    let first = watch_list.record_violation("OE", 5.0);
    assert_eq!(first.last_ela_ms, 5.0);
    assert_eq!(first.worst_ela_ms, 5.0);
    assert_eq!(first.num_violations, 1);

    // A smaller elapsed updates last but not worst.
    let second = watch_list.record_violation("OE", 3.0);
    assert_eq!(second.last_ela_ms, 3.0);
    assert_eq!(second.worst_ela_ms, 5.0);
    assert_eq!(second.num_violations, 2);

    let third = watch_list.record_violation("OE", 8.5);
    assert_eq!(third.worst_ela_ms, 8.5);
    assert_eq!(third.num_violations, 3);

    assert_eq!(watch_list.stats("OE"), Some(third));
    assert_eq!(watch_list.stats("GL"), None);
}

/// Violations recorded from concurrent workers must all be counted.
#[test]
fn test_record_violation_is_thread_safe() {
    use std::sync::Arc;

    let watch_list = Arc::new(WatchList::from_entries(vec![MonitoredSql {
        business_tx: "OE".to_string(),
        threshold_ms: 1,
        sql_ids: vec!["abc".to_string()],
    }]));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let watch_list = Arc::clone(&watch_list);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    watch_list.record_violation("OE", 2.0);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(watch_list.stats("OE").unwrap().num_violations, 400);
}
