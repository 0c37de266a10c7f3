//! Process-wide `tracing` subscriber.
//!
//! Logging is configured from the environment so it is in place before the
//! CLI is parsed:
//!
//! | variable       | values                                | default                  |
//! |----------------|---------------------------------------|--------------------------|
//! | `LOG_FORMAT`   | `json`, `pretty`                      | `json` in production     |
//! | `LOG_OUTPUT`   | `stdout`, `stderr`, `file`            | `stderr`                 |
//! | `LOG_DIR`      | directory used by `file` output       | `logs`                   |
//! | `LOG_ROTATION` | `daily`, `hourly`, `never`            | `daily`                  |
//! | `ENVIRONMENT`  | `production`/`prod` logs at `info`    | `development` (`debug`)  |
//!
//! `RUST_LOG` replaces the default filter entirely. Unrecognised values fall
//! back to the default for that setting.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// File name (or rotation prefix) used for `file` output.
pub const LOG_FILE_NAME: &str = "repositories-api.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    /// A single file that grows forever
    Never,
}

impl LogRotation {
    fn as_rotation(self) -> Rotation {
        match self {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub log_dir: PathBuf,
    pub rotation: LogRotation,
    pub environment: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let setting = |key: &str| lookup(key).map(|value| value.trim().to_ascii_lowercase());

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("ENV"))
            .unwrap_or_else(|| "development".to_string());
        let production = is_production(&environment);

        let format = match setting("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            _ if production => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let output = match setting("LOG_OUTPUT").as_deref() {
            Some("stdout") => LogOutput::Stdout,
            Some("file") => LogOutput::File,
            _ => LogOutput::Stderr,
        };
        let rotation = match setting("LOG_ROTATION").as_deref() {
            Some("hourly") => LogRotation::Hourly,
            Some("never") => LogRotation::Never,
            _ => LogRotation::Daily,
        };

        Self {
            format,
            output,
            log_dir: lookup("LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from),
            rotation,
            environment,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    fn default_directives(&self) -> String {
        let level = if is_production(&self.environment) { "info" } else { "debug" };
        format!("{level},hyper=info,tower_http={level}")
    }
}

fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

fn open_writer(config: &LoggingConfig) -> Result<(NonBlocking, WorkerGuard)> {
    let writer = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            fs::create_dir_all(&config.log_dir).with_context(|| {
                format!("failed to create log directory {:?}", config.log_dir)
            })?;
            let appender = RollingFileAppender::builder()
                .rotation(config.rotation.as_rotation())
                .filename_prefix(LOG_FILE_NAME)
                .build(&config.log_dir)
                .with_context(|| format!("failed to open log file in {:?}", config.log_dir))?;
            tracing_appender::non_blocking(appender)
        }
    };
    Ok(writer)
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until exit; dropping it flushes and stops the
/// background writer.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));
    let (writer, guard) = open_writer(&config)?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(config.output != LogOutput::File)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        rotation = ?config.rotation,
        "logging initialized"
    );
    Ok(guard)
}
