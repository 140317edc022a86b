//! Log backend for the bench binary. The libraries only use the `log`
//! facade; this is where records actually get written.

use anyhow::{Context, Result};
use flexi_logger::{DeferredNow, Logger, LoggerHandle};
use log::Record;

fn line_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> std::io::Result<()> {
    write!(
        w,
        "{} {:<5} [{}] {}",
        now.format("%H:%M:%S%.3f"),
        record.level(),
        std::thread::current().name().unwrap_or("<unnamed>"),
        record.args()
    )
}

/// Starts the logger. Keep the handle alive until the program exits.
pub fn init(spec: &str) -> Result<LoggerHandle> {
    Logger::try_with_str(spec)
        .with_context(|| format!("invalid log specification '{spec}'"))?
        .format(line_format)
        .start()
        .context("failed to start logger")
}
