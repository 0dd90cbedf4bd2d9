//! Logging setup
//!
//! Compact or JSON output to stderr, optionally mirrored to a daily-rotated
//! file through a non-blocking writer. `RUST_LOG` applies unless `debug` is
//! set, which forces `debug` everywhere.

use crate::error::Result;
use anyhow::Context;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,

    /// Force `debug` regardless of `RUST_LOG`
    pub debug: bool,

    /// JSON lines instead of compact text
    pub json: bool,

    /// Log to stderr
    pub stderr: bool,

    /// Also log to this file, rotated daily
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            debug: false,
            json: false,
            stderr: true,
            file_path: None,
        }
    }
}

impl LogConfig {
    pub fn filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::builder()
                .with_default_directive(self.level.into())
                .from_env_lossy()
        }
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process, or buffered
/// file output is lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.stderr {
        layers.push(fmt_layer(std::io::stderr, config.json, true));
    }

    if let Some(file_path) = &config.file_path {
        let directory = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = file_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("trusttunnel-manager.log"));
        let appender = tracing_appender::rolling::daily(directory, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(writer, config.json, false));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(config.filter())
        .try_init()
        .context("failed to install logger")?;

    Ok(guard)
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    #[serial]
    fn test_debug_flag_overrides_env() {
        temp_env::with_var("RUST_LOG", Some("error"), || {
            let config = LogConfig {
                debug: true,
                ..Default::default()
            };
            assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::DEBUG));
        });
    }

    #[test]
    #[serial]
    fn test_rust_log_wins_over_default_level() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            let config = LogConfig::default();
            assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::WARN));
        });
    }

    #[test]
    #[serial]
    fn test_second_install_fails() {
        let quiet = || LogConfig {
            stderr: false,
            ..Default::default()
        };
        // The first call may lose to another test that already installed one
        let _ = init_logging(quiet());

        let err = init_logging(quiet()).unwrap_err();
        assert!(matches!(err, crate::error::ManagerError::Generic(_)), "{err:?}");
        assert_eq!(err.sanitized_message(), "Internal error occurred");
    }

    #[test]
    #[serial]
    fn test_default_level() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LogConfig::default();
            assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::INFO));
        });
    }
}
