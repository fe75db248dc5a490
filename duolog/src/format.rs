use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

use colored::Color::{BrightGreen, BrightRed};
use duolog_core::Fields;

use crate::color::{Color, Style};

/// Levels that reach a console stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Info,
    Error,
}

impl Severity {
    pub(crate) fn label(self, color: &Color) -> String {
        let (label, fg) = match self {
            Severity::Info => ("INFO", BrightGreen),
            Severity::Error => ("ERROR", BrightRed),
        };
        color.decorate(Style::BOLD.fg(fg), label).into_owned()
    }
}

/// Renders one event for humans:
///
/// ```text
/// <label>: <message>
///   <key>: <value>
///
/// ```
///
/// `label` is used as given, so decorate it beforehand. Keys are bold when
/// `color` is enabled. Values are written as JSON: strings quoted, composites
/// in compact form.
pub fn render(label: &str, message: &str, fields: &Fields, color: &Color) -> String {
    let mut block = format!("{label}: {message}\n");
    for (key, value) in fields.iter() {
        block.push_str(&format!("  {}: {value}\n", color.decorate(Style::BOLD, key)));
    }
    block.push('\n');
    block
}

/// Writes a whole block in one call so concurrent events never interleave.
/// Console output is best-effort: a closed stream does not fail the caller.
pub(crate) fn print(stream: &Mutex<Box<dyn Write + Send>>, block: &str) {
    let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
    let _ = stream
        .write_all(block.as_bytes())
        .and_then(|()| stream.flush());
}
