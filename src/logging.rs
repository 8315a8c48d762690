//! Tracing setup: human-readable stderr plus a daily rolling log file.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// File name prefix inside the log directory.
pub const LOG_FILE_PREFIX: &str = "order_processing.log";

/// Install the global subscriber.
///
/// Stderr honours `RUST_LOG` (default `info`); the file always records
/// `debug` for this crate so a run can be audited afterwards. Keep the
/// returned guard alive until exit or buffered file output is lost.
pub fn configure_logging(log_dir: &Path) -> WorkerGuard {
    let stderr_log = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let file_log = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(EnvFilter::new("info,order_resolver=debug"));

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(file_log)
        .init();

    guard
}
