//! Configuration management module for the trace analyzer.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation


use std::env;
use std::path::PathBuf;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container for the trace analyzer components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AnalyzerConfig {
    /// Monitored database and trace directory settings
    pub trace: TraceConfig,
    /// Watch-list (business tx -> SQL ids) input file
    pub watch_list: WatchListConfig,
    /// Durable read-offset roster settings
    pub roster: RosterConfig,
    /// Violation emission backend settings
    pub sink: SinkConfig,
    /// Log file destination
    pub log: LogConfig,
}

impl AnalyzerConfig {
    /// Creates a new configuration with hierarchical override support.
    ///
    /// Configuration sources are merged in the following order (later sources
    /// override earlier ones):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from the `CONFIG_PATH` environment variable
    /// 3. Environment variables with `ORATAIL__` prefix (highest priority)
    ///
    /// # Example
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "oratail.toml");
    /// std::env::set_var("ORATAIL__TRACE__DB_NAME", "orcl");
    /// let cfg = AnalyzerConfig::load()?;
    /// ```
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("ORATAIL")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-component configuration rules
    pub fn validate(&self) -> Result<()> {
        self.trace.validate()?;
        self.watch_list.validate()?;
        self.sink.validate()?;
        Ok(())
    }
}

/// Which database to monitor and where its trace files appear
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TraceConfig {
    /// Database name; trace files are selected by the
    /// `{db_name}_ora_*.trc` basename pattern
    #[serde(default)]
    pub db_name: String,

    /// Diagnostic directory the database writes trace files into
    #[serde(default)]
    pub dir_name: String,

    /// Which filesystem events spawn or wake a Miner
    /// Default value: write (via WatchMode::default)
    #[serde(default)]
    pub mode: WatchMode,

    /// Upper bound on records read per Miner iteration
    /// Default value: 1 (via default_records_per_batch)
    #[serde(default = "default_records_per_batch")]
    pub records_per_batch: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            db_name: String::new(),
            dir_name: String::new(),
            mode: WatchMode::default(),
            records_per_batch: default_records_per_batch(),
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.db_name.is_empty() {
            return Err(ConfigError::Message("trace.db_name is required".into()).into());
        }
        if self.dir_name.is_empty() {
            return Err(ConfigError::Message("trace.dir_name is required".into()).into());
        }
        if self.records_per_batch == 0 {
            return Err(
                ConfigError::Message("trace.records_per_batch cannot be 0".into()).into(),
            );
        }
        Ok(())
    }
}

/// Filesystem event acceptance policy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Accept create and modify events
    #[default]
    Write,
    /// Accept create events only
    Create,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchListConfig {
    /// Path to the watch-list input file
    /// Default value: rtta.sqlinput (via default_watch_list_path)
    #[serde(default = "default_watch_list_path")]
    pub path: PathBuf,
}

impl Default for WatchListConfig {
    fn default() -> Self {
        Self {
            path: default_watch_list_path(),
        }
    }
}

impl WatchListConfig {
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Message("watch_list.path is required".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RosterConfig {
    /// Path of the persisted roster document
    /// Default value: rtta.roster (via default_roster_path)
    #[serde(default = "default_roster_path")]
    pub path: PathBuf,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: default_roster_path(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SinkConfig {
    /// Output media for violation summaries
    /// Default value: varz (via default_output_type)
    #[serde(default = "default_output_type")]
    pub output_type: String,

    /// Directory the varz sink writes metric files into
    /// Default value: data.d (via default_varz_dir)
    #[serde(default = "default_varz_dir")]
    pub varz_dir: PathBuf,

    /// Credentials file for externally-registered queue backends; unused by
    /// the built-in varz sink
    #[serde(default)]
    pub credentials: String,

    /// Project identifier for externally-registered queue backends
    #[serde(default)]
    pub project_name: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            output_type: default_output_type(),
            varz_dir: default_varz_dir(),
            credentials: String::new(),
            project_name: String::new(),
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_type == "varz" && self.varz_dir.as_os_str().is_empty() {
            return Err(
                ConfigError::Message("sink.varz_dir is required for the varz sink".into()).into(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Directory the process log file is written into
    /// Default value: log (via default_log_dir)
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
        }
    }
}

fn default_records_per_batch() -> usize {
    1
}

fn default_watch_list_path() -> PathBuf {
    PathBuf::from("rtta.sqlinput")
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("rtta.roster")
}

fn default_output_type() -> String {
    "varz".to_string()
}

fn default_varz_dir() -> PathBuf {
    PathBuf::from("data.d")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log")
}
