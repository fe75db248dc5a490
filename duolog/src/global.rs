use std::sync::{LazyLock, PoisonError, RwLock};

use duolog_core::{Caller, Fields, Level};
use log::{
    LevelFilter, Log, SetLoggerError,
    kv::{self, VisitSource},
};

use crate::Logger;

/// Process-wide logger. Starts as [`Logger::nop`] and lives until exit.
static GLOBAL_LOGGER: LazyLock<RwLock<Logger>> = LazyLock::new(|| RwLock::new(Logger::nop()));

/// Returns a handle to the process-wide logger.
pub fn global() -> Logger {
    GLOBAL_LOGGER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the process-wide logger and returns the previous one, so that
/// it can still be flushed.
pub fn set_global(logger: Logger) -> Logger {
    let mut global = GLOBAL_LOGGER.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *global, logger)
}

/// Routes the `log` macros to the process-wide logger.
///
/// Key/values become fields; the module path is recorded as `_function`.
/// Trace and debug are recorded only, info goes to the info stream, warn
/// and error go to the error stream.
pub fn init_log_bridge(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge))?;
    log::set_max_level(max_level);
    Ok(())
}

struct LogBridge;

impl Log for LogBridge {
    /// Info and above always reach the console, so only debug and trace
    /// are skipped when the sink would drop them.
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        match Level::from(metadata.level()) {
            Level::Debug => global().structured().enabled(Level::Debug),
            _ => true,
        }
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut fields = Fields::new();
        // A failing source still leaves the pairs visited so far.
        let _ = record.key_values().visit(&mut FieldCollector(&mut fields));
        let caller = record
            .file()
            .zip(record.line())
            .map(|(file, line)| Caller { file, line });
        global().emit(
            record.level().into(),
            &record.args().to_string(),
            &fields,
            caller,
            record.module_path(),
        );
    }

    fn flush(&self) {
        if let Err(err) = global().flush() {
            eprintln!("duolog: flush failed: {err}");
        }
    }
}

struct FieldCollector<'a>(&'a mut Fields);

impl<'kvs> VisitSource<'kvs> for FieldCollector<'_> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.push(key.as_str(), value);
        Ok(())
    }
}
