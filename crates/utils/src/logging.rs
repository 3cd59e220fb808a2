//! provides logging helpers

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

pub const LOG_FILE_PREFIX: &str = "nebula.log";

fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// initiate the global tracing subscriber
///
/// Always logs to stderr. When `log_dir` is given a daily rolling file is written
/// there as well; keep the returned guard alive for as long as the process logs.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter());

    let Some(log_dir) = log_dir else {
        registry().with(fmt_layer).init();
        return None;
    };

    match rolling_appender(log_dir) {
        Ok(appender) => {
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let file_layer = layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter());
            registry().with(fmt_layer).with(file_layer).init();
            Some(file_guard)
        }
        Err(e) => {
            registry().with(fmt_layer).init();
            tracing::warn!(log_dir = %log_dir.display(), "file logging disabled: {e}");
            None
        }
    }
}

fn rolling_appender(
    log_dir: &Path,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(3)
        .build(log_dir)
}
