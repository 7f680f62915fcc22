//! Logging and tracing utilities

use crate::config::LogConfig;
use crate::session::RunContext;
use anyhow::Context;
use std::fs::{self, File};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for one session.
///
/// Everything at `config.file_filter` (or `RUST_LOG`) goes to the session's
/// log file without ANSI colouring; only `config.console_filter` and above is
/// echoed to stderr so the interactive prompt stays readable.
pub fn init_session_logging(ctx: &RunContext, config: &LogConfig) -> anyhow::Result<()> {
    if let Some(parent) = ctx.log_path().parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let file = File::create(ctx.log_path())
        .with_context(|| format!("creating log file {}", ctx.log_path().display()))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.file_filter));

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(file_filter);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(&config.console_filter));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}
