use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_LOG_FILE: &str = "heartbeat.log";
pub const LOG_ENV: &str = "HEARTBEAT_LOG";

/// Debug runs log everything to stderr; normal runs append warnings and
/// errors to `log_file`.
pub fn init(debug: bool, log_file: &Path) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{:>8}] --- {} ({}:{})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0)
        )
    });

    if debug {
        builder
            .filter_level(LevelFilter::Debug)
            .target(env_logger::Target::Stderr);
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {:?}", log_file))?;
        builder
            .filter_level(LevelFilter::Warn)
            .target(env_logger::Target::Pipe(Box::new(file)));
    }

    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }

    builder.try_init().context("Logger already initialized")?;
    Ok(())
}
