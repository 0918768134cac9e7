//! Local-file sink: one single-line metric file per business transaction.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::Sink;
use super::Summary;
use crate::constants::VARZ_FILE_EXTENSION;
use crate::constants::VARZ_FILE_PREFIX;
use crate::errors::SinkError;
use crate::Result;

/// Writes each violation as a one-line varz record to
/// `<dir>/<prefix>.<db>.<normalized business tx><ext>`, overwriting the
/// previous line for that transaction.
#[derive(Debug)]
pub struct VarzSink {
    db_name: String,
    dir: PathBuf,
    file_prefix: String,
    file_extension: String,
}

impl VarzSink {
    pub fn new(db_name: String, dir: PathBuf) -> Self {
        Self {
            db_name,
            dir,
            file_prefix: VARZ_FILE_PREFIX.to_string(),
            file_extension: VARZ_FILE_EXTENSION.to_string(),
        }
    }
}

#[async_trait]
impl Sink for VarzSink {
    async fn publish(&self, summary: Summary) -> Result<()> {
        let file_name = self.dir.join(format!(
            "{}.{}.{}{}",
            self.file_prefix,
            self.db_name,
            normalize_name(&summary.business_tx),
            self.file_extension
        ));
        let message = format!(
            "oratail{{id={},businesstxname={:?},runtimethreshold={:.1},sqlid={}}} map:stats lastela:{:.3} worstela:{:.3} violations:{}\n",
            self.db_name,
            summary.business_tx,
            summary.threshold_ms,
            summary.sql_id,
            summary.last_ela_ms,
            summary.worst_ela_ms,
            summary.num_violations
        );
        debug!(file = %file_name.display(), %message, "writing varz record");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::VarzWrite {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&file_name, message)
            .await
            .map_err(|source| SinkError::VarzWrite {
                path: file_name,
                source,
            })?;
        Ok(())
    }
}

/// Normalizes a business tx name for use in a file name: lower case, with
/// spaces and `#` mapped to underscores.
pub(crate) fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '#'], "_")
}
