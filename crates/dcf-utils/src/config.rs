//! Logging configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how verbosely a session is logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory holding one `<session-id>.log` file per run
    pub log_dir: PathBuf,
    /// Filter for the session log file, overridden by `RUST_LOG`
    pub file_filter: String,
    /// Filter for diagnostics echoed to stderr
    pub console_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("log"),
            file_filter: "info".to_string(),
            console_filter: "warn".to_string(),
        }
    }
}

impl LogConfig {
    /// Override the log directory from `DCF_LOG_DIR` when set
    pub fn with_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("DCF_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        self
    }

    /// Set the log directory
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}
