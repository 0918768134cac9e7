use std::sync::Arc;

use chrono::Utc;
use tempfile::tempdir;

use super::*;
use crate::config::AnalyzerConfig;
use crate::test_utils::enable_logger;

fn summary() -> Summary {
    Summary {
        db_name: "orcl".to_string(),
        business_tx: "Order Entry".to_string(),
        threshold_ms: 1.0,
        sql_id: "abc".to_string(),
        worst_ela_ms: 5.0,
        last_ela_ms: 5.0,
        num_violations: 1,
        enqueue_time: Utc::now(),
    }
}

#[test]
fn test_normalize_name() {
    assert_eq!(normalize_name("OE"), "oe");
    assert_eq!(normalize_name("Order Entry"), "order_entry");
    assert_eq!(normalize_name("Batch#7 Close"), "batch_7_close");
    assert_eq!(normalize_name("already_plain"), "already_plain");
}

#[tokio::test]
async fn test_varz_publish_writes_metric_file() {
    enable_logger();
    let dir = tempdir().unwrap();
    // The data directory does not exist yet; publish must create it.
    let varz_dir = dir.path().join("data.d");

    let sink = VarzSink::new("orcl".to_string(), varz_dir.clone());
    sink.publish(summary()).await.unwrap();

    let contents =
        std::fs::read_to_string(varz_dir.join("oratail.orcl.order_entry.varz")).unwrap();
    assert_eq!(
        contents,
        "oratail{id=orcl,businesstxname=\"Order Entry\",runtimethreshold=1.0,sqlid=abc} map:stats lastela:5.000 worstela:5.000 violations:1\n"
    );
}

#[tokio::test]
async fn test_varz_publish_overwrites_previous_line() {
    enable_logger();
    let dir = tempdir().unwrap();
    let sink = VarzSink::new("orcl".to_string(), dir.path().to_path_buf());

    sink.publish(summary()).await.unwrap();
    let mut second = summary();
    second.last_ela_ms = 2.5;
    second.worst_ela_ms = 5.0;
    second.num_violations = 2;
    sink.publish(second).await.unwrap();

    let contents =
        std::fs::read_to_string(dir.path().join("oratail.orcl.order_entry.varz")).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("lastela:2.500 worstela:5.000 violations:2"));
}

#[test]
fn test_build_sink_selects_varz() {
    enable_logger();
    let mut config = AnalyzerConfig::default();
    config.trace.db_name = "orcl".to_string();
    let sink = build_sink(&config);
    assert!(sink.is_ok());
}

#[test]
fn test_build_sink_rejects_unknown_output_type() {
    enable_logger();
    let mut config = AnalyzerConfig::default();
    config.trace.db_name = "orcl".to_string();
    config.sink.output_type = "streamz".to_string();
    let e = build_sink(&config).unwrap_err();
    assert!(matches!(
        e,
        crate::Error::Sink(crate::SinkError::UnknownOutputType(_))
    ));
}

#[test]
fn test_summary_from_violation() {
    let violation = crate::trace::Violation {
        business_tx: "OE".to_string(),
        threshold_ms: 1.0,
        sql_id: "abc".to_string(),
        worst_ela_ms: 5.0,
        last_ela_ms: 3.0,
        num_violations: 2,
    };
    let summary = Summary::from_violation("orcl", violation);
    assert_eq!(summary.db_name, "orcl");
    assert_eq!(summary.business_tx, "OE");
    assert_eq!(summary.last_ela_ms, 3.0);
    assert_eq!(summary.num_violations, 2);
}

// Keeps the trait object-safe and cloneable the way the watchdog hands it to
// miners.
#[test]
fn test_sink_is_shareable() {
    let sink: Arc<dyn Sink> = Arc::new(VarzSink::new(
        "orcl".to_string(),
        std::path::PathBuf::from("/tmp"),
    ));
    let _clone = Arc::clone(&sink);
}
