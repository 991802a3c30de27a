// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::time::{Duration, Instant};

pub fn init_logger(level: LevelFilter) {
    let logger = Box::new(ColoredLogger::new(level));
    log::set_boxed_logger(logger).ok();
    log::set_max_level(level);
}

/// Falls back to `RUST_LOG` handling through env_logger.
pub fn init_from_env() {
    env_logger::try_init().ok();
}

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

struct ColoredLogger {
    level: LevelFilter,
}

impl ColoredLogger {
    fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    fn format_level(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let target = if record.target().is_empty() {
            String::new()
        } else {
            format!("[{}]", record.target())
        };

        eprintln!(
            "{} {} {}",
            Self::format_level(record.level()),
            target.dimmed(),
            record.args()
        );
    }

    fn flush(&self) {}
}

pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &str) -> Self {
        log::debug!("[TIMER] {} started", name);
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!(
            "[TIMER] {} took {:.2}ms",
            self.name,
            self.start.elapsed().as_secs_f64() * 1000.0
        );
    }
}
