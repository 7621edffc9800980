// src/log.rs
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::options::LogOptions;
use crate::error::Result;

/// Install the global subscriber.
///
/// - filter: `RUST_LOG` if set, else `opts.level`
/// - console: human-readable, stderr (stdout is reserved for command output)
/// - file: JSON lines, rolled daily under `opts.dir`, only when `opts.dir` is set
///
/// The returned guard flushes the file writer on drop; hold it until exit.
/// Calling twice is harmless: the second call returns `Ok(None)`.
pub fn init(opts: &LogOptions) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&opts.level));

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(opts.ansi);

    let (file_layer, guard) = match &opts.dir {
        Some(dir) => {
            crate::file::ensure_directory(dir)?;
            let appender = rolling::daily(dir, "raingauge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();

    // try_init only fails when a global subscriber is already installed
    match installed {
        Ok(()) => Ok(guard),
        Err(_) => Ok(None),
    }
}
