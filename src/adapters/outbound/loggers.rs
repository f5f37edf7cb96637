use crate::domains::logger::{DomainLogger, DynLogger, FileLogger};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// fast_log may only be initialized once per process; later file-logger
/// requests reuse the first initialization.
static FILE_LOGGER_INIT: OnceCell<()> = OnceCell::new();

struct ConsoleLogger;

impl DomainLogger for ConsoleLogger {
    fn info(&self, msg: &str) {
        println!("{}", msg);
    }
    fn warn(&self, msg: &str) {
        println!("WARN: {}", msg);
    }
    fn error(&self, msg: &str) {
        eprintln!("ERROR: {}", msg);
    }
}

struct NoopLogger;

impl DomainLogger for NoopLogger {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

/// Forwards to a primary logger and optionally mirrors to a secondary
/// one, so file and console output can be combined without widening the
/// DomainLogger trait.
pub struct MultiLogger {
    primary: DynLogger,
    secondary: Option<DynLogger>,
}

impl MultiLogger {
    pub fn new(primary: DynLogger, secondary: Option<DynLogger>) -> Self {
        Self { primary, secondary }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.primary.info(msg);
        if let Some(sec) = &self.secondary {
            sec.info(msg);
        }
    }

    fn warn(&self, msg: &str) {
        self.primary.warn(msg);
        if let Some(sec) = &self.secondary {
            sec.warn(msg);
        }
    }

    fn error(&self, msg: &str) {
        self.primary.error(msg);
        if let Some(sec) = &self.secondary {
            sec.error(msg);
        }
    }
}

/// Console-backed DomainLogger, the usual fallback.
pub fn init_console_logger() -> DynLogger {
    Arc::new(ConsoleLogger)
}

/// Silent logger for unit tests.
pub fn init_noop_logger() -> DynLogger {
    Arc::new(NoopLogger)
}

/// File-backed DomainLogger via fast_log.
pub fn init_file_logger(path: &str) -> Result<DynLogger, String> {
    FILE_LOGGER_INIT
        .get_or_try_init(|| {
            FileLogger::init(path).map_err(|e| format!("Failed to initialize fast_log: {}", e))
        })
        .map(|_| Arc::new(FileLogger) as DynLogger)
}

/// File logger mirrored to the console; falls back to console-only when
/// the file sink cannot be initialized.
pub fn init_combined_logger(path: &str) -> DynLogger {
    let console = init_console_logger();
    match init_file_logger(path) {
        Ok(file) => Arc::new(MultiLogger::new(file, Some(console))),
        Err(_) => console,
    }
}
