//! Process-wide tracing setup.
//!
//! One rolling log file (text, or flattened JSON lines) plus colored stdout in
//! text mode. `RUST_LOG` overrides the configured level.

use anyhow::{Context, bail};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Map the `rotation` setting onto an appender policy.
pub fn parse_rotation(value: &str) -> anyhow::Result<Rotation> {
    match value.trim().to_ascii_lowercase().as_str() {
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        "never" => Ok(Rotation::NEVER),
        other => bail!(
            "unknown log rotation '{}' (expected minutely, hourly, daily or never)",
            other
        ),
    }
}

/// `RUST_LOG` when set, else the configured level with sqlx statement logs capped at warn.
fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("{},sqlx=warn", level))
        .with_context(|| format!("invalid log_level '{}'", level))
}

fn file_appender(config: &AppConfig) -> anyhow::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(parse_rotation(&config.rotation)?)
        .filename_prefix(&config.log_file)
        .build(&config.log_dir)
        .with_context(|| format!("cannot open log directory '{}'", config.log_dir))
}

/// Install the global subscriber. The guard flushes the file writer on drop,
/// so hold it for the life of the process.
pub fn init_logging(config: &AppConfig) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    let (json_file, text_file, stdout) = if config.use_json {
        let layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(writer);
        (Some(layer), None, None)
    } else {
        let file = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer);
        let stdout = fmt::layer().with_target(false);
        (None, Some(file), Some(stdout))
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level)?)
        .with(json_file)
        .with(text_file)
        .with(stdout)
        .try_init()
        .context("global tracing subscriber already installed")?;

    Ok(guard)
}
