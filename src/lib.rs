//! # oratail
//!
//! A real-time analyzer for Oracle 10046 SQL trace files. It tails every
//! trace file a database's server processes write into the diagnostic
//! directory and emits an alert the moment a monitored SQL statement's
//! elapsed time crosses its user-declared threshold.
//!
//! ## Features
//! - **Streaming**: records are analyzed as they are appended, not on a poll
//! - **Durable offsets**: a roster persists per-file read positions, so a
//!   restart resumes each file instead of rereading it
//! - **One worker per file**: a watchdog discovers trace files and keeps at
//!   most one miner task on each
//! - **Pluggable emission**: violations go to a [`sink::Sink`] capability;
//!   the built-in backend writes local varz metric files
//!
//! ## Quick Start
//! ```no_run
//! use std::sync::Arc;
//!
//! use oratail::config::AnalyzerConfig;
//! use oratail::watchdog::Watchdog;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = AnalyzerConfig::load().unwrap();
//!     let (_graceful_tx, graceful_rx) = watch::channel(());
//!
//!     let mut watchdog = Watchdog::new(Arc::new(settings), graceful_rx).unwrap();
//!     watchdog.run().await.unwrap();
//! }
//! ```
//!
//! Data flow: filesystem events → watchdog → (per file) miner → reader →
//! record lexer → parser (cursor table + watch list) → sink.

pub mod config;
pub mod miner;
pub mod sink;
pub mod storage;
pub mod trace;
pub mod watchdog;
pub mod watchlist;

mod constants;
mod errors;

pub use errors::*;

#[doc(hidden)]
pub mod utils;

//-----------------------------------------------------------
// Test utils
#[cfg(test)]
#[doc(hidden)]
pub(crate) mod test_utils;
