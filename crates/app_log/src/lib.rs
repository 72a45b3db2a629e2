//! Portfolio logging & crash reporting
//!
//! Structured logging to console and a daily JSON file, a panic hook that
//! leaves a crash dump behind, and a deadlock detector in debug builds.

mod logging;
mod panic_hook;

pub use logging::{cleanup_old_logs, init_logging, LogConfig, LogGuard};
pub use panic_hook::{crash_dump_path, init_panic_hook};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "Portfolio", "Portfolio")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features.
///
/// The returned guard flushes the log file when dropped; keep it alive for
/// the whole run.
pub fn init(config: LogConfig) -> anyhow::Result<LogGuard> {
    let guard = init_logging(&config)?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(guard)
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    let spawned = thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }
            tracing::error!("{} deadlock(s) detected", deadlocks.len());
            for (i, threads) in deadlocks.iter().enumerate() {
                for t in threads {
                    tracing::error!("Deadlock #{} thread {:?}\n{:?}", i, t.thread_id(), t.backtrace());
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Deadlock detector not started: {}", e);
    }
}
