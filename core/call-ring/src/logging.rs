//! File logging for the CLI.
//!
//! Logs go to `~/.call-ring/logs/call-ring.log.<date>` so stdout stays clean
//! for command output. `RUST_LOG` overrides the default filter; otherwise the
//! provider configuration's `logEnabled` raises call-core to debug.

use call_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "call-ring.log";

pub fn default_directive(log_enabled: bool) -> &'static str {
    if log_enabled {
        "info,call_core=debug,call_ring=debug"
    } else {
        "info"
    }
}

/// Installs the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn init(storage: &StorageConfig, log_enabled: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_enabled)));

    let logs_dir = storage.logs_dir();
    if let Err(e) = fs_err::create_dir_all(&logs_dir) {
        // No log directory: fall back to stderr rather than lose diagnostics.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        tracing::warn!(path = %logs_dir.display(), error = %e, "Log directory unavailable");
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}
