//! Formatted informational, warning and error text on the diagnostic stream.

use std::io::{self, IsTerminal, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    /// ANSI SGR code for the label.
    fn color(self) -> &'static str {
        match self {
            Level::Info => "1;34",
            Level::Warning => "1;33",
            Level::Error => "1;31",
        }
    }
}

/// Writes diagnostics to a sink, stderr unless told otherwise.
///
/// Write failures are returned but callers generally ignore them: a closed
/// diagnostic stream must not change the outcome of a parse.
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
}

impl Reporter<io::Stderr> {
    /// Reporter on stderr, coloured when stderr is a terminal and `NO_COLOR` is unset.
    pub fn stderr() -> Self {
        let stderr = io::stderr();
        let color = stderr.is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { out: stderr, color }
    }
}

impl<W: Write> Reporter<W> {
    /// Plain reporter on any sink.
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn line(&mut self, level: Level, message: &str) -> io::Result<()> {
        if self.color {
            writeln!(
                self.out,
                "\x1b[{}m{}:\x1b[0m {}",
                level.color(),
                level.label(),
                message
            )
        } else {
            writeln!(self.out, "{}: {}", level.label(), message)
        }
    }

    pub fn info(&mut self, message: &str) -> io::Result<()> {
        self.line(Level::Info, message)
    }

    pub fn warn(&mut self, message: &str) -> io::Result<()> {
        self.line(Level::Warning, message)
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        self.line(Level::Error, message)
    }

    /// Write a block of text as-is (help, usage, version).
    pub fn text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    /// Consume the reporter and return its sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}
