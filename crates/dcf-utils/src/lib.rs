//! Shared utilities for dcf-rs
//!
//! This crate provides common functionality used across the dcf-rs workspace:
//! the per-invocation run context (session id, log file location) and the
//! tracing setup that writes every session to its own log file.

pub mod config;
pub mod logging;
pub mod session;

pub use config::LogConfig;
pub use logging::init_session_logging;
pub use session::RunContext;
