//! Structured logging setup with tracing

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where and how much to log
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set
    pub default_filter: String,
    /// Mirror records to the console (always on in debug builds)
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: super::log_dir(),
            file_prefix: "portfolio.log".into(),
            default_filter: "info".into(),
            console: cfg!(debug_assertions),
        }
    }
}

/// Flushes buffered file output on drop
pub struct LogGuard {
    _file: WorkerGuard,
    dir: PathBuf,
}

impl LogGuard {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Initialize the logging system
pub fn init_logging(config: &LogConfig) -> anyhow::Result<LogGuard> {
    std::fs::create_dir_all(&config.dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = (config.console || cfg!(debug_assertions)).then(|| fmt::layer().pretty());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(fmt::layer().json().with_writer(non_blocking))
        .try_init()?;

    tracing::info!("Logging initialized in {:?}", config.dir);
    Ok(LogGuard {
        _file: guard,
        dir: config.dir.clone(),
    })
}

/// Delete `.log` files in `dir` untouched for more than `days` days
pub fn cleanup_old_logs(dir: &Path, days: u32) -> anyhow::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let threshold = SystemTime::now() - Duration::from_secs(days as u64 * 24 * 60 * 60);
    let mut deleted = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_log_file(&path) {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if matches!(modified, Ok(t) if t < threshold) && std::fs::remove_file(&path).is_ok() {
            deleted += 1;
            tracing::debug!("Deleted old log: {:?}", path);
        }
    }

    tracing::info!("Cleaned up {} old log files", deleted);
    Ok(deleted)
}

/// Daily rotation appends the date after the prefix: `portfolio.log.2024-05-01`
fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".log") || n.contains(".log."))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_is_log_file() {
        assert!(is_log_file(Path::new("portfolio.log")));
        assert!(is_log_file(Path::new("portfolio.log.2024-05-01")));
        assert!(!is_log_file(Path::new("settings.toml")));
    }

    #[test]
    fn test_cleanup_old_logs() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("portfolio.log.2020-01-01");
        let fresh = dir.path().join("portfolio.log.2099-01-01");
        let other = dir.path().join("notes.txt");

        for path in [&old, &fresh, &other] {
            File::create(path).unwrap();
        }
        let long_ago = SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60);
        File::options().write(true).open(&old).unwrap().set_modified(long_ago).unwrap();
        File::options().write(true).open(&other).unwrap().set_modified(long_ago).unwrap();

        assert_eq!(cleanup_old_logs(dir.path(), 7).unwrap(), 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("gone"), 7).unwrap(), 0);
    }
}
