use tempfile::tempdir;

use super::*;
use crate::test_utils::enable_logger;

#[test]
fn test_load_missing_roster_is_empty() {
    enable_logger();
    let dir = tempdir().unwrap();
    let roster = Roster::load(&dir.path().join("rtta.roster")).unwrap();
    assert!(roster.is_empty());
}

#[test]
fn test_open_trace_unknown_file_starts_fresh() {
    enable_logger();
    let dir = tempdir().unwrap();
    let trace_path = dir.path().join("orcl_ora_1.trc");
    std::fs::write(&trace_path, "line\n").unwrap();

    let roster = Roster::default();
    let state = roster.open_trace(&trace_path, 1).unwrap();
    assert_eq!(state.version(), 1);
    assert_eq!(state.offset(), 0);
}

#[test]
fn test_save_and_round_trip() {
    enable_logger();
    let dir = tempdir().unwrap();
    let trace_path = dir.path().join("orcl_ora_1.trc");
    std::fs::write(&trace_path, "first\nsecond\n").unwrap();
    // The roster directory does not exist yet; save must create it.
    let roster_path = dir.path().join("home").join("rtta.roster");

    let roster = Roster::default();
    let mut state = roster.open_trace(&trace_path, 10).unwrap();
    state.read_batch().unwrap();
    roster.save(&roster_path, &state).unwrap();

    // The document is human-readable with the historical key names.
    let raw = std::fs::read_to_string(&roster_path).unwrap();
    assert!(raw.contains("\"Name\""));
    assert!(raw.contains("\"DirectoryName\""));
    assert!(raw.contains("\"Version\""));
    assert!(raw.contains("\"Offset\""));

    let reloaded = Roster::load(&roster_path).unwrap();
    let record = reloaded.record(&trace_path).unwrap();
    assert_eq!(
        record,
        RosterRecord {
            name: "orcl_ora_1.trc".to_string(),
            directory: dir.path().to_path_buf(),
            version: 1,
            offset: 13,
        }
    );

    // Resuming opens at the persisted offset.
    let mut resumed = reloaded.open_trace(&trace_path, 10).unwrap();
    assert_eq!(resumed.offset(), 13);
    assert!(resumed.read_batch().unwrap().is_empty());
}

#[test]
fn test_save_upserts_one_record_per_file() {
    enable_logger();
    let dir = tempdir().unwrap();
    let trace_path = dir.path().join("orcl_ora_1.trc");
    std::fs::write(&trace_path, "one\ntwo\n").unwrap();
    let roster_path = dir.path().join("rtta.roster");

    let roster = Roster::default();
    let mut state = roster.open_trace(&trace_path, 1).unwrap();

    state.read_batch().unwrap();
    roster.save(&roster_path, &state).unwrap();
    let first_offset = roster.record(&trace_path).unwrap().offset;

    state.read_batch().unwrap();
    roster.save(&roster_path, &state).unwrap();

    assert_eq!(roster.len(), 1);
    let second_offset = roster.record(&trace_path).unwrap().offset;
    // Offsets only move forward for an unchanged version.
    assert!(second_offset > first_offset);

    let reloaded = Roster::load(&roster_path).unwrap();
    assert_eq!(reloaded.record(&trace_path).unwrap().offset, second_offset);
}

#[test]
fn test_save_tracks_multiple_files() {
    enable_logger();
    let dir = tempdir().unwrap();
    let roster_path = dir.path().join("rtta.roster");
    let roster = Roster::default();

    for index in 1..=3 {
        let trace_path = dir.path().join(format!("orcl_ora_{index}.trc"));
        std::fs::write(&trace_path, "line\n").unwrap();
        let mut state = roster.open_trace(&trace_path, 10).unwrap();
        state.read_batch().unwrap();
        roster.save(&roster_path, &state).unwrap();
    }

    let reloaded = Roster::load(&roster_path).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(
        reloaded
            .record(&dir.path().join("orcl_ora_2.trc"))
            .unwrap()
            .offset,
        5
    );
}

#[test]
fn test_load_rejects_garbage() {
    enable_logger();
    let dir = tempdir().unwrap();
    let roster_path = dir.path().join("rtta.roster");
    std::fs::write(&roster_path, "not a roster").unwrap();

    assert!(Roster::load(&roster_path).is_err());
}
