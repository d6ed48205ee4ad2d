//! Logging initialization

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::args::{Args, LogFormat};

/// Initialize logging based on CLI arguments
/// 引擎 crate 的 `log` 记录经 tracing-log 桥接输出
pub fn init(args: &Args) -> Result<()> {
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file = match &args.log_file {
        Some(path) => Some(
            std::fs::File::create(path).with_context(|| format!("Failed to create log file: {}", path))?,
        ),
        None => None,
    };

    match args.log_format {
        LogFormat::Text => {
            let file_layer = file.map(|f| fmt::layer().with_ansi(false).with_writer(f));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(args.verbose >= 2)
                        .with_thread_ids(args.verbose >= 3)
                        .with_file(args.verbose >= 3)
                        .with_line_number(args.verbose >= 3),
                )
                .with(file_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let file_layer = file.map(|f| fmt::layer().json().with_writer(f));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let file_layer = file.map(|f| fmt::layer().compact().with_ansi(false).with_writer(f));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .with(file_layer)
                .try_init()?;
        }
    }

    Ok(())
}
