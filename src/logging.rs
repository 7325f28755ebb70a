//! Structured logging and tracing for Solarlog
//!
//! Console output plus an optional daily-rotated log file, both driven by
//! `tracing-subscriber`. Components obtain a [`StructuredLogger`] through
//! [`get_logger`] so every line carries `component=...` and, where known,
//! the operation and the date or timestamp being processed.

mod level;
mod state;
mod structured;

pub use level::{level_rank, min_level, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

use crate::config::LoggingConfig;
use crate::error::{Result, SolarlogError};
use state::{INIT_ERROR, INIT_ONCE, LOG_GUARD};
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging system based on configuration
///
/// `verbose` lowers every layer to at least DEBUG. Only the first call has an
/// effect; later calls return the outcome of the first one.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    INIT_ONCE.call_once(|| {
        let init_result = (|| -> Result<()> {
            let base_level = parse_log_level(&config.level)?;

            let console_level = effective_level(config.console_level.as_deref(), base_level, verbose);
            let file_level = effective_level(config.file_level.as_deref(), base_level, verbose);

            let most_verbose = min_level(console_level, file_level);
            let filter = build_env_filter(most_verbose);

            let file_layer = match config.file.as_deref().filter(|f| !f.trim().is_empty()) {
                Some(file) if !should_use_console_only() => {
                    let file_appender = rolling::Builder::new()
                        .rotation(rolling::Rotation::DAILY)
                        .filename_prefix("solarlog")
                        .filename_suffix("log")
                        .max_log_files(config.backup_count.max(1) as usize)
                        .build({
                            // If config.file is a file path, use its parent dir; otherwise treat as dir
                            let p = Path::new(file);
                            if p.extension().is_some() {
                                p.parent().unwrap_or(p)
                            } else {
                                p
                            }
                        })
                        .map_err(|e| {
                            SolarlogError::io(format!("Failed to create log file appender: {}", e))
                        })?;

                    let (non_blocking_appender, guard) = non_blocking(file_appender);
                    let _ = LOG_GUARD.set(guard);

                    let base = fmt::layer()
                        .with_writer(non_blocking_appender)
                        .with_ansi(false)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false);
                    Some(if config.json_format {
                        base.json()
                            .with_filter(LevelFilter::from_level(file_level))
                            .boxed()
                    } else {
                        base.with_filter(LevelFilter::from_level(file_level))
                            .boxed()
                    })
                }
                _ => None,
            };

            // Never run silent: console stays on when there is no file layer
            let console_layer = if config.console_output || file_layer.is_none() {
                let base = fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false);
                Some(if config.json_format {
                    base.json()
                        .with_filter(LevelFilter::from_level(console_level))
                        .boxed()
                } else {
                    base.with_filter(LevelFilter::from_level(console_level))
                        .boxed()
                })
            } else {
                None
            };

            let has_file = file_layer.is_some();
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(console_layer)
                .try_init()
                .map_err(|e| SolarlogError::config(format!("Failed to install logger: {}", e)))?;

            info!(
                "Logging initialized - console_level: {:?}, file_level: {:?}, file: {}",
                console_level,
                file_level,
                if has_file {
                    config.file.as_deref().unwrap_or("-")
                } else {
                    "-"
                }
            );
            Ok(())
        })();

        if let Err(e) = init_result {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(SolarlogError::config(err.clone()));
    }
    Ok(())
}

fn effective_level(override_level: Option<&str>, base: Level, verbose: bool) -> Level {
    let level = override_level
        .and_then(|s| parse_log_level(s).ok())
        .unwrap_or(base);
    if verbose {
        min_level(level, Level::DEBUG)
    } else {
        level
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "solarlog={},reqwest=warn,hyper=warn,html5ever=error",
            level
        )
        .into()
    })
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("SOLARLOG_DISABLE_FILE_LOG").is_some()
}
