use log::{LevelFilter, Metadata, Record};
use std::sync::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use chrono::Local;
use crate::error::{Error, Result};

/// Append-only file logger with local timestamps.
pub struct FileLogger {
    file: Mutex<std::fs::File>,
    level: LevelFilter,
}

impl FileLogger {
    pub fn new(log_file: &Path, level: LevelFilter) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;

        Ok(Self {
            file: Mutex::new(file),
            level,
        })
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            // a failed log write has nowhere to be reported
            let _ = writeln!(
                file,
                "{} [{}] {}: {}",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse()
        .map_err(|_| Error::ConfigError(format!("unknown log level: {}", level)))
}

/// Installs the global logger: a file logger when `log_file` is set, otherwise
/// `env_logger` on stderr, where `RUST_LOG` still overrides `level`.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let logger = FileLogger::new(path, level)?;
            log::set_boxed_logger(Box::new(logger))
                .map_err(|e| Error::InternalError(e.to_string()))?;
            log::set_max_level(level);
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .try_init()
                .map_err(|e| Error::InternalError(e.to_string()))?;
        }
    }
    Ok(())
}
