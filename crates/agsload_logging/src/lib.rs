//! Shared logging setup for agsload binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "agsload=info,agsload_core=info,agsload_ags=info,agsload_db=info";
const VERBOSE_LOG_FILTER: &str =
    "agsload=debug,agsload_core=debug,agsload_ags=debug,agsload_db=debug";
const HOME_ENV: &str = "AGSLOAD_HOME";

/// Logging configuration for one process.
pub struct LogConfig<'a> {
    /// Log file prefix, e.g. `agsload` -> `agsload.log.2026-01-31`.
    pub app_name: &'a str,
    /// Debug output on stderr and in the file.
    pub verbose: bool,
    /// Only warnings on stderr; stdout stays clean for machine-readable output.
    pub quiet: bool,
}

/// Install a daily rolling file layer and a stderr layer.
///
/// Keep the returned guard alive until exit so buffered file output is flushed. When the
/// log directory cannot be created, logging continues on stderr only and no guard is
/// returned.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let file_filter = base_filter(config.verbose);
    let console_filter = if config.quiet {
        EnvFilter::new("warn")
    } else {
        base_filter(config.verbose)
    };

    let mut guard = None;
    let file_layer = match ensure_logs_dir() {
        Ok(log_dir) => {
            let file_appender =
                tracing_appender::rolling::daily(log_dir, format!("{}.log", config.app_name));
            let (file_writer, worker_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// `RUST_LOG` wins; otherwise the default (or verbose) agsload directives.
fn base_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

/// The agsload home directory: `$AGSLOAD_HOME` or `~/.agsload`.
pub fn agsload_home() -> Result<PathBuf> {
    home_from(std::env::var_os(HOME_ENV).map(PathBuf::from), dirs::home_dir())
}

fn home_from(override_path: Option<PathBuf>, home_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    home_dir
        .map(|home| home.join(".agsload"))
        .context("Could not determine home directory; set AGSLOAD_HOME")
}

/// The logs directory: `<home>/logs`.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(agsload_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    create_dir(&logs)?;
    Ok(logs)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create logs directory: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_override_wins() {
        let home = home_from(Some(PathBuf::from("/srv/agsload")), Some(PathBuf::from("/home/u")));
        assert_eq!(home.unwrap(), PathBuf::from("/srv/agsload"));
    }

    #[test]
    fn test_home_defaults_under_user_home() {
        let home = home_from(None, Some(PathBuf::from("/home/u"))).unwrap();
        assert_eq!(home, PathBuf::from("/home/u/.agsload"));
    }

    #[test]
    fn test_home_without_any_directory_fails() {
        let err = home_from(None, None).unwrap_err();
        assert!(err.to_string().contains("AGSLOAD_HOME"));
    }

    #[test]
    fn test_verbose_directives() {
        assert!(default_directives(false).contains("agsload=info"));
        assert!(default_directives(true).contains("agsload_db=debug"));
    }

    #[test]
    fn test_create_dir_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("logs");
        create_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
