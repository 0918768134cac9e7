//! Pluggable emission of violation summaries.
//!
//! The core requires only the [`Sink`] capability: a single `publish`
//! operation called from a Miner's worker task. Publish may be slow and its
//! errors surface to the calling Miner. The built-in implementation is the
//! local-file [`VarzSink`]; queue and telemetry backends live outside the
//! core and are injected at construction.

mod varz;

pub use varz::*;

#[cfg(test)]
mod varz_test;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tracing::info;

use crate::config::AnalyzerConfig;
use crate::errors::SinkError;
use crate::trace::Violation;
use crate::Result;

/// The emission payload: one violation, stamped with the database it came
/// from and the moment it was handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub db_name: String,
    pub business_tx: String,
    pub threshold_ms: f64,
    pub sql_id: String,
    pub worst_ela_ms: f64,
    pub last_ela_ms: f64,
    pub num_violations: i64,
    pub enqueue_time: DateTime<Utc>,
}

impl Summary {
    pub fn from_violation(db_name: &str, violation: Violation) -> Self {
        Self {
            db_name: db_name.to_string(),
            business_tx: violation.business_tx,
            threshold_ms: violation.threshold_ms,
            sql_id: violation.sql_id,
            worst_ela_ms: violation.worst_ela_ms,
            last_ela_ms: violation.last_ela_ms,
            num_violations: violation.num_violations,
            enqueue_time: Utc::now(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Sink: std::fmt::Debug + Send + Sync + 'static {
    /// Publishes one violation summary for further processing.
    async fn publish(&self, summary: Summary) -> Result<()>;
}

/// Instantiates the configuration-selected output media.
pub fn build_sink(config: &AnalyzerConfig) -> Result<Arc<dyn Sink>> {
    match config.sink.output_type.as_str() {
        "varz" => {
            info!("the requested output media is an ASCII file (referred to as varz)");
            Ok(Arc::new(VarzSink::new(
                config.trace.db_name.clone(),
                config.sink.varz_dir.clone(),
            )))
        }
        other => Err(SinkError::UnknownOutputType(other.to_string()).into()),
    }
}
