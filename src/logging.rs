use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils;

const DEFAULT_DIRECTIVE: &str = "concert_draft=info";
const LOG_FILE_PREFIX: &str = "concert-draft.log";

/// Console output on stderr plus a daily JSON file under the data directory.
/// Keep the returned guard alive for the whole process so the file writer
/// flushes on exit.
pub fn init_logging() -> WorkerGuard {
    let logs_dir = utils::logs_dir();
    utils::ensure_parent(&logs_dir.join(LOG_FILE_PREFIX));

    let file_appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // stdout carries command output, so the console layer writes to stderr.
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let file_layer = fmt::layer().json().with_writer(file_writer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
