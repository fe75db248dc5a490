//! # duolog
//! Dual-sink logger: every event becomes a structured JSON line for the log
//! file and a readable, optionally colored block for the console.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! duolog = "0.1.0"
//! ```
//!
//! ```rust
//! use duolog::{Color, Logger, LogStream, StructuredLogger, fields};
//!
//! let logger = Logger::builder(
//!     StructuredLogger::deterministic(LogStream::new(std::io::sink())),
//!     Color::none(),
//! )
//! .build();
//! logger.info(
//!     "Now we're logging :)",
//!     fields! { "key" => "value", "otherkey" => "othervalue" },
//! );
//! // prints:
//! // INFO: Now we're logging :)
//! //   key: "value"
//! //   otherkey: "othervalue"
//! logger.flush().unwrap();
//! ```
//!
//! ## Logging to rotating files
//! `StructuredLogger::standard` adds `_timestamp`, `_caller`, `_pid` and
//! `_version` to every record. Without a writer it discards everything.
//!
//! ```rust
//! use duolog::{Color, Level, Logger, RotatingFile, RotationConfig, StructuredLogger, fields};
//!
//! let dir = std::env::temp_dir().join("duolog_doc_rotation");
//! let file = RotatingFile::new(RotationConfig::new(&dir, "app")).unwrap();
//! let logger = Logger::builder(
//!     StructuredLogger::standard(Some(file), Level::Debug, "v1.0.0"),
//!     Color::prepare(false).unwrap(),
//! )
//! .with_stdout(std::io::sink())
//! .build();
//! logger.debug("only in the file", fields! { "attempt" => 1 });
//! logger.flush().unwrap();
//! ```
//!
//! ## Panics in threads
//! Create a [`PanicGuard`] first thing in every thread (or use
//! [`Logger::spawn`]). A panic is recorded with its stack trace, then keeps
//! unwinding.
//!
//! ```rust
//! use duolog::Logger;
//!
//! let logger = Logger::nop();
//! let handle = logger.spawn(|| 40 + 2);
//! assert_eq!(handle.join().unwrap(), 42);
//! ```

mod color;
mod format;
mod global;
mod panic;

pub use color::{Color, Style};
pub use duolog_core::{
    Caller, DUOLOG_CONFIG, EncoderConfig, Entry, Error, Fields, Level, LogFile, LogStream,
    LogWriter, Result, RotatingFile, RotationConfig, SinkBuilder, StructuredLogger, fields,
};
pub use format::render;
pub use global::{global, init_log_bridge, set_global};
pub use panic::PanicGuard;

use std::{
    io::{self, Write},
    panic::Location,
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use format::Severity;

type Stream = Arc<Mutex<Box<dyn Write + Send>>>;

/// Sends each event to a [`StructuredLogger`] and, for info and error, to a
/// console stream.
///
/// Clones share the sink and the streams. Safe to use from many threads: a
/// console block is written in one call under the stream lock.
#[derive(Clone)]
pub struct Logger {
    sink: StructuredLogger,
    color: Color,
    stdout: Stream,
    stderr: Stream,
}

impl Logger {
    /// Starts building a logger around an existing sink and color capability.
    pub fn builder(sink: StructuredLogger, color: Color) -> LoggerBuilder {
        LoggerBuilder {
            sink,
            color,
            stdout: None,
            stderr: None,
        }
    }

    /// A logger that never writes or prints anything.
    pub fn nop() -> Self {
        Self::builder(StructuredLogger::nop(), Color::none())
            .with_stdout(io::sink())
            .with_stderr(io::sink())
            .build()
    }

    /// A logger whose structured records carry `_name`.
    pub fn named(&self, name: &str) -> Self {
        Self {
            sink: self.sink.named(name),
            ..self.clone()
        }
    }

    /// The structured sink shared by this logger and its clones.
    pub fn structured(&self) -> &StructuredLogger {
        &self.sink
    }

    /// The color capability used for console blocks.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Records at info level and prints to the info stream.
    #[track_caller]
    pub fn info(&self, message: &str, fields: Fields) {
        self.emit(Level::Info, message, &fields, Some(Location::caller().into()), None);
    }

    /// Records at error level and prints to the error stream.
    #[track_caller]
    pub fn error(&self, message: &str, fields: Fields) {
        self.emit(Level::Error, message, &fields, Some(Location::caller().into()), None);
    }

    /// Records at debug level. Nothing is printed.
    #[track_caller]
    pub fn debug(&self, message: &str, fields: Fields) {
        self.emit(Level::Debug, message, &fields, Some(Location::caller().into()), None);
    }

    /// Flushes buffered structured records. Call before the process exits.
    pub fn flush(&self) -> Result<()> {
        self.sink.flush()
    }

    /// Returns a guard that records a panic unwinding through its scope.
    /// Create it first thing in each thread.
    pub fn log_on_panic(&self) -> PanicGuard {
        PanicGuard::new(self.clone())
    }

    /// Spawns a thread guarded by [`Logger::log_on_panic`].
    pub fn spawn<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let logger = self.clone();
        std::thread::spawn(move || {
            let _guard = logger.log_on_panic();
            f()
        })
    }

    pub(crate) fn emit(
        &self,
        level: Level,
        message: &str,
        fields: &Fields,
        caller: Option<Caller<'_>>,
        function: Option<&str>,
    ) {
        self.sink.write(Entry {
            level,
            message,
            fields,
            caller,
            function,
            stacktrace: None,
        });
        let (stream, severity) = match level {
            Level::Info => (&self.stdout, Severity::Info),
            Level::Error => (&self.stderr, Severity::Error),
            Level::Debug | Level::Panic => return,
        };
        let block = render(&severity.label(&self.color), message, fields, &self.color);
        format::print(stream, &block);
    }
}

/// Builder for a [`Logger`]. Streams left unset default to the process
/// stdout (info) and stderr (error).
pub struct LoggerBuilder {
    sink: StructuredLogger,
    color: Color,
    stdout: Option<Box<dyn Write + Send>>,
    stderr: Option<Box<dyn Write + Send>>,
}

impl LoggerBuilder {
    /// Sets the stream receiving info blocks
    pub fn with_stdout<W: Write + Send + 'static>(self, stdout: W) -> Self {
        Self {
            stdout: Some(Box::new(stdout)),
            ..self
        }
    }

    /// Sets the stream receiving error blocks
    pub fn with_stderr<W: Write + Send + 'static>(self, stderr: W) -> Self {
        Self {
            stderr: Some(Box::new(stderr)),
            ..self
        }
    }

    /// Builds the logger, falling back to process stdout and stderr.
    pub fn build(self) -> Logger {
        let Self {
            sink,
            color,
            stdout,
            stderr,
        } = self;
        let stdout = stdout.unwrap_or_else(|| Box::new(io::stdout()));
        let stderr = stderr.unwrap_or_else(|| Box::new(io::stderr()));
        Logger {
            sink,
            color,
            stdout: Arc::new(Mutex::new(stdout)),
            stderr: Arc::new(Mutex::new(stderr)),
        }
    }
}
