//! # duolog-core
//! Core utilities for duolog: the structured JSON-lines sink, the writers it
//! writes to, and the shared field, level and error types.
//!
//! ```rust
//! use duolog_core::{LogStream, StructuredLogger, fields};
//!
//! let logger = StructuredLogger::deterministic(LogStream::new(std::io::sink()));
//! logger.info("Hello, world!", &fields! { "key" => "value" });
//! logger.flush().unwrap();
//! ```

mod config;
mod error;
mod fields;
mod level;
mod log_rotation;
mod log_writer;
mod structured;

pub use config::{DUOLOG_CONFIG, DuologConfig};
pub use error::{Error, Result};
pub use fields::Fields;
pub use level::{Level, ParseLevelError};
pub use log_rotation::{RotatingFile, RotationConfig};
pub use log_writer::{LogFile, LogStream, LogWriter};
pub use structured::{Caller, EncoderConfig, Entry, SinkBuilder, StructuredLogger};
