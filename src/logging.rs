use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_PREFIX: &str = "hermes_installer";

pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("{LOG_PREFIX}_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Routes `tracing` events into a timestamped file under `logs_dir`.
///
/// The returned guard flushes the writer on drop and must live until exit.
pub fn init(logs_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::never(logs_dir, log_file_name(Local::now()));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::log_file_name;

    #[test]
    fn log_file_name_carries_timestamp() {
        let now = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time");
        assert_eq!(log_file_name(now), "hermes_installer_20240309_140507.log");
    }
}
