//! Operator-facing terminal output.

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use std::io::{self, Write};

/// Colored, verbosity-aware console writer.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    choice: ColorChoice,
}

impl OutputManager {
    /// Creates a manager. `quiet` suppresses everything but errors.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let choice = if std::env::var_os("NO_COLOR").is_some() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Self {
            verbose,
            quiet,
            choice,
        }
    }

    fn write_colored(&self, stderr: bool, color: Option<Color>, bold: bool, prefix: &str, message: &str) -> io::Result<()> {
        let mut stream = if stderr {
            StandardStream::stderr(self.choice)
        } else {
            StandardStream::stdout(self.choice)
        };
        if !prefix.is_empty() {
            stream.set_color(ColorSpec::new().set_fg(color).set_bold(bold))?;
            write!(stream, "{prefix}")?;
            stream.reset()?;
            write!(stream, " ")?;
        }
        writeln!(stream, "{message}")
    }

    /// Plain informational line.
    pub fn info(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(false, None, false, "", message)
    }

    /// Only shown with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose || self.quiet {
            return Ok(());
        }
        self.write_colored(false, Some(Color::Cyan), false, "·", message)
    }

    /// Warning line.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(true, Some(Color::Yellow), true, "⚠", message)
    }

    /// Error line, always shown.
    pub fn error(&self, message: &str) -> io::Result<()> {
        self.write_colored(true, Some(Color::Red), true, "✗", message)
    }

    /// Success line.
    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(false, Some(Color::Green), true, "✓", message)
    }

    /// Progress line.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(false, Some(Color::Blue), true, "→", message)
    }

    /// Section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut stream = StandardStream::stdout(self.choice);
        writeln!(stream)?;
        stream.set_color(ColorSpec::new().set_bold(true).set_underline(true))?;
        write!(stream, "{title}")?;
        stream.reset()?;
        writeln!(stream)
    }

    /// Indented detail line.
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(false, None, false, "", &format!("  {message}"))
    }
}
