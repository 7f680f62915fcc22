//! Per-invocation run context

use chrono::{DateTime, Local};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Identity of a single program run.
///
/// Created once at startup and handed to every component that logs, so the
/// session id and log location never live in global state.
#[derive(Debug, Clone)]
pub struct RunContext {
    session_id: String,
    log_path: PathBuf,
    started_at: DateTime<Local>,
}

impl RunContext {
    /// Create a context with a fresh session id, logging under `log_dir`
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        let started_at = Local::now();
        let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
        let session_id = format!("{}{suffix}", started_at.format("%Y%m%d%H%M%S"));
        Self::with_session_id(session_id, log_dir)
    }

    /// Create a context with a known session id
    pub fn with_session_id(session_id: impl Into<String>, log_dir: impl AsRef<Path>) -> Self {
        let session_id = session_id.into();
        let log_path = log_dir.as_ref().join(format!("{session_id}.log"));
        Self {
            session_id,
            log_path,
            started_at: Local::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}
