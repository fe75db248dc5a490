use std::borrow::Cow;

use duolog_core::Result;

/// Terminal attributes applied by [`Color::decorate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub fg: Option<colored::Color>,
}

impl Style {
    pub const BOLD: Style = Style {
        bold: true,
        fg: None,
    };

    pub const fn fg(self, color: colored::Color) -> Self {
        Style {
            fg: Some(color),
            ..self
        }
    }
}

/// Color capability of a logger. Disabled, decoration returns text as is.
///
/// Codes are produced regardless of whether the output is a terminal: the
/// caller decides by enabling or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    enabled: bool,
}

impl Color {
    /// Prepares the terminal for ANSI codes when `enabled`.
    ///
    /// On Windows this turns on virtual terminal processing, which can fail
    /// on old consoles; callers may fall back to [`Color::none`].
    pub fn prepare(enabled: bool) -> Result<Self> {
        if enabled {
            enable_ansi()?;
        }
        Ok(Self { enabled })
    }

    /// Never decorates.
    pub fn none() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Codes are written directly so output never depends on tty or `NO_COLOR` detection.
    pub fn decorate<'a>(&self, style: Style, text: &'a str) -> Cow<'a, str> {
        if !self.enabled || style == Style::default() {
            return Cow::Borrowed(text);
        }
        let mut codes: Vec<Cow<'static, str>> = Vec::with_capacity(2);
        if style.bold {
            codes.push("1".into());
        }
        if let Some(fg) = style.fg {
            codes.push(fg.to_fg_str().into());
        }
        Cow::Owned(format!("\x1B[{}m{text}\x1B[0m", codes.join(";")))
    }
}

#[cfg(windows)]
fn enable_ansi() -> Result<()> {
    colored::control::set_virtual_terminal(true).map_err(|_| {
        duolog_core::Error::Color("virtual terminal processing unavailable".into())
    })
}

#[cfg(not(windows))]
fn enable_ansi() -> Result<()> {
    Ok(())
}
