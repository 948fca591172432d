use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_PREFIX: &str = "medscout.log";

/// Daily-rolling log file in `log_dir` at `RUST_LOG` (default `info`),
/// plus warnings and errors on stderr so the interactive prompt stays
/// readable. Keep the returned guard alive until exit or buffered lines
/// are lost. Without a log directory only the stderr layer is installed.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact()
        .with_filter(LevelFilter::WARN);

    let (file_layer, guard) = match log_dir.map(|dir| std::fs::create_dir_all(dir).map(|_| dir)) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(env_filter));
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Failed to create log directory: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    guard
}
