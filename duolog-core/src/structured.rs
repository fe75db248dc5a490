use std::{
    io,
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Local;
use serde::Serialize;

use crate::{
    config::DUOLOG_CONFIG,
    error::Result,
    fields::Fields,
    level::Level,
    log_writer::LogWriter,
};

/// Names of the reserved keys of a structured record. `None` omits the key.
///
/// Reserved keys are prefixed with `_` so that they sort before user keys
/// when a record is viewed with alphabetical key ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub time_key: Option<&'static str>,
    pub level_key: Option<&'static str>,
    pub name_key: Option<&'static str>,
    pub caller_key: Option<&'static str>,
    pub function_key: Option<&'static str>,
    pub message_key: Option<&'static str>,
    pub stacktrace_key: Option<&'static str>,
}

impl EncoderConfig {
    pub fn standard() -> Self {
        Self {
            time_key: Some("_timestamp"),
            level_key: Some("_level"),
            name_key: Some("_name"),
            caller_key: Some("_caller"),
            function_key: Some("_function"),
            message_key: Some("_msg"),
            stacktrace_key: Some("_stacktrace"),
        }
    }

    /// Keeps only fields that are identical from one run to the next.
    pub fn deterministic() -> Self {
        Self {
            time_key: None,
            caller_key: None,
            function_key: None,
            stacktrace_key: None,
            ..Self::standard()
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Source location of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl From<&'static Location<'static>> for Caller<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl Caller<'_> {
    /// `dir/file.rs:line`, keeping only the last two path components.
    fn short(&self) -> String {
        let file = self.file;
        let short = file
            .rmatch_indices(|c| c == '/' || c == '\\')
            .nth(1)
            .map_or(file, |(idx, _)| &file[idx + 1..]);
        format!("{short}:{}", self.line)
    }
}

/// One event as handed to [`StructuredLogger::write`].
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub level: Level,
    pub message: &'a str,
    pub fields: &'a Fields,
    pub caller: Option<Caller<'a>>,
    pub function: Option<&'a str>,
    pub stacktrace: Option<&'a str>,
}

struct Sink {
    level: Level,
    encoder: EncoderConfig,
    /// Attached to every record, after the reserved keys.
    context: Fields,
    state: Mutex<SinkState>,
}

struct SinkState {
    writer: Box<dyn LogWriter>,
    /// First write error since the last flush, reported by `flush`.
    error: Option<io::Error>,
}

/// Emits one JSON object per line to a [`LogWriter`].
///
/// Cheap to clone; clones share the writer. The nop logger never writes and
/// never fails.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Option<Arc<Sink>>,
    name: Option<Arc<str>>,
}

impl StructuredLogger {
    /// A logger that discards everything.
    pub fn nop() -> Self {
        Self {
            sink: None,
            name: None,
        }
    }

    /// Standard encoder with `_pid` and `_version` on every record.
    /// Without a writer, returns [`StructuredLogger::nop`].
    pub fn standard<W: LogWriter + 'static>(
        writer: Option<W>,
        level: Level,
        version: &str,
    ) -> Self {
        match writer {
            Some(writer) => SinkBuilder::new(writer)
                .with_level(level)
                .with_version(version)
                .build(),
            None => Self::nop(),
        }
    }

    /// Records only level, name, message and user keys, at every level.
    /// For golden-file tests.
    pub fn deterministic<W: LogWriter + 'static>(writer: W) -> Self {
        SinkBuilder::new(writer)
            .with_level(Level::Debug)
            .with_encoder(EncoderConfig::deterministic())
            .build()
    }

    /// A child logger sharing this writer whose records carry `name`.
    /// Nested names are joined with a dot.
    pub fn named(&self, name: &str) -> Self {
        let name = match &self.name {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        Self {
            sink: self.sink.clone(),
            name: Some(name.into()),
        }
    }

    pub fn is_nop(&self) -> bool {
        self.sink.is_none()
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.sink.as_ref().is_some_and(|sink| level >= sink.level)
    }

    #[track_caller]
    pub fn debug(&self, message: &str, fields: &Fields) {
        self.log(Level::Debug, message, fields);
    }

    #[track_caller]
    pub fn info(&self, message: &str, fields: &Fields) {
        self.log(Level::Info, message, fields);
    }

    #[track_caller]
    pub fn error(&self, message: &str, fields: &Fields) {
        self.log(Level::Error, message, fields);
    }

    /// Records a Panic-level event with its stack trace.
    #[track_caller]
    pub fn panic(&self, message: &str, fields: &Fields, stacktrace: &str) {
        self.write(Entry {
            level: Level::Panic,
            message,
            fields,
            caller: Some(Location::caller().into()),
            function: None,
            stacktrace: Some(stacktrace),
        });
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: &str, fields: &Fields) {
        self.write(Entry {
            level,
            message,
            fields,
            caller: Some(Location::caller().into()),
            function: None,
            stacktrace: None,
        });
    }

    /// Encodes and writes one record. Write errors are kept for `flush`.
    pub fn write(&self, entry: Entry<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };
        if entry.level < sink.level {
            return;
        }
        let line = sink.encode(&entry, self.name.as_deref());
        let mut state = sink.lock();
        if let Err(err) = state.writer.write_line(&line) {
            state.error.get_or_insert(err);
        }
    }

    /// Flushes buffered records, even after a failed write. Returns the
    /// first write error since the previous flush, if any, otherwise the
    /// flush result.
    pub fn flush(&self) -> Result<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let mut state = sink.lock();
        let flushed = state.writer.flush();
        if let Some(err) = state.error.take() {
            return Err(err.into());
        }
        flushed?;
        Ok(())
    }
}

impl Sink {
    // Logging must keep working after a panic poisoned the lock.
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn encode(&self, entry: &Entry<'_>, name: Option<&str>) -> String {
        let keys = &self.encoder;
        let mut record = RecordEncoder::default();
        if let Some(key) = keys.level_key {
            record.field(key, entry.level.as_str());
        }
        if let Some(key) = keys.time_key {
            let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string();
            record.field(key, &now);
        }
        if let (Some(key), Some(name)) = (keys.name_key, name) {
            record.field(key, name);
        }
        if let (Some(key), Some(caller)) = (keys.caller_key, entry.caller) {
            record.field(key, &caller.short());
        }
        if let (Some(key), Some(function)) = (keys.function_key, entry.function) {
            record.field(key, function);
        }
        if let Some(key) = keys.message_key {
            record.field(key, entry.message);
        }
        if let (Some(key), Some(stacktrace)) = (keys.stacktrace_key, entry.stacktrace) {
            record.field(key, stacktrace);
        }
        for (key, value) in self.context.iter().chain(entry.fields.iter()) {
            record.field(key, value);
        }
        record.finish()
    }
}

#[derive(Default)]
struct RecordEncoder {
    buf: Vec<u8>,
}

impl RecordEncoder {
    fn field<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) {
        self.buf.push(if self.buf.is_empty() { b'{' } else { b',' });
        // Strings and JSON values always serialize into memory.
        let _ = serde_json::to_writer(&mut self.buf, key);
        self.buf.push(b':');
        let _ = serde_json::to_writer(&mut self.buf, value);
    }

    fn finish(mut self) -> String {
        if self.buf.is_empty() {
            self.buf.push(b'{');
        }
        self.buf.push(b'}');
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Builder for a [`StructuredLogger`] writing to any [`LogWriter`].
///
/// The minimum level defaults to `DUOLOG_LEVEL` and the encoder to
/// [`EncoderConfig::standard`].
pub struct SinkBuilder {
    writer: Box<dyn LogWriter>,
    level: Level,
    encoder: EncoderConfig,
    version: Option<String>,
}

impl SinkBuilder {
    pub fn new<W: LogWriter + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
            level: DUOLOG_CONFIG.LEVEL,
            encoder: EncoderConfig::standard(),
            version: None,
        }
    }

    /// Sets the minimum recorded level
    pub fn with_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    /// Sets the reserved key names
    pub fn with_encoder(self, encoder: EncoderConfig) -> Self {
        Self { encoder, ..self }
    }

    /// Attaches `_pid` and `_version` to every record
    pub fn with_version(self, version: &str) -> Self {
        Self {
            version: Some(version.into()),
            ..self
        }
    }

    pub fn build(self) -> StructuredLogger {
        let Self {
            writer,
            level,
            encoder,
            version,
        } = self;
        let context = match version {
            Some(version) => Fields::new()
                .with("_pid", std::process::id())
                .with("_version", version),
            None => Fields::new(),
        };
        StructuredLogger {
            sink: Some(Arc::new(Sink {
                level,
                encoder,
                context,
                state: Mutex::new(SinkState {
                    writer,
                    error: None,
                }),
            })),
            name: None,
        }
    }
}
