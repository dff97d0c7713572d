//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production
//! environments: console output (plain or JSON) plus an optional daily
//! rotating file layer.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system.
///
/// # Arguments
/// * `level` - Default log level when `RUST_LOG` is unset ("info", "debug", ...)
/// * `json_format` - JSON console output (true for production)
/// * `log_dir` - Optional directory for daily rotating `storefront.*` files
///
/// Returns the file appender guard; keep it alive for the process lifetime
/// or buffered log lines are lost.
///
/// ```no_run
/// let _guard = storefront::utils::logger::init_logger("info", false, Some("logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let mut guard = None;
    let file_layer = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "storefront.log");
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(fmt::layer().with_writer(writer).with_ansi(false).boxed())
        }
        None => None,
    };

    let console_layer = if json_format {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    registry.with(console_layer).with(file_layer).init();

    Ok(guard)
}
