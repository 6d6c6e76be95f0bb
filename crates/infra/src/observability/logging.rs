//! Structured logging initialization.
//!
//! Configures the tracing subscriber for diagnostic output. The `RUST_LOG`
//! environment variable takes precedence over the configured level.

use std::path::Path;

use oplink_domain::{LogFormat, LoggingConfig, OplinkError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// When [`LoggingConfig::file`] is set, output goes to a daily rolling file
/// through a non-blocking writer and the returned guard must be held for as
/// long as logs should be flushed. Otherwise output goes to stdout and no
/// guard is returned.
///
/// # Errors
/// Returns `OplinkError::Config` if the filter directive is invalid or the
/// file path has no file name, and `OplinkError::Internal` if a global
/// subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use oplink_domain::LoggingConfig;
///
/// let _guard = oplink_infra::observability::logging::init(&LoggingConfig::default())?;
/// tracing::info!("client starting");
/// # Ok::<(), oplink_domain::OplinkError>(())
/// ```
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    match config.file.as_deref() {
        Some(path) => {
            let (directory, prefix) = split_log_path(path)?;
            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            install(config, filter, writer, false)?;
            Ok(Some(guard))
        }
        None => {
            install(config, filter, std::io::stdout, true)?;
            Ok(None)
        }
    }
}

/// Filter from `RUST_LOG` when set, from the configured level otherwise
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::try_from_default_env()
            .map_err(|e| OplinkError::Config(format!("Invalid RUST_LOG directive: {e}")));
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| OplinkError::Config(format!("Invalid log level '{}': {e}", config.level)))
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let prefix = path.file_name().ok_or_else(|| {
        OplinkError::Config(format!("Log file path has no file name: {}", path.display()))
    })?;
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    Ok((directory, prefix))
}

fn install<W>(config: &LoggingConfig, filter: EnvFilter, writer: W, ansi: bool) -> Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(ansi).with_target(config.target).with_writer(writer))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_ansi(ansi).with_target(config.target).with_writer(writer))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.target).with_writer(writer))
            .try_init(),
    };
    result.map_err(|e| OplinkError::Internal(format!("Failed to install tracing subscriber: {e}")))
}
