//! Centralized shell output for status and progress lines.
//!
//! Commands never format status lines themselves; they hand the Shell a
//! semantic [`Status`] and a message, and the Shell decides colors and
//! verbosity. Progress spinners (via indicatif) are suppressed when the
//! diagnostic stream is not a terminal or in quiet mode.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No status lines, no progress.
    Quiet,
    /// Status messages plus progress spinners.
    #[default]
    Normal,
    /// Immediate status lines, debug info, no spinners.
    Verbose,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // In-progress (cyan)
    Fetching,
    Extracting,
    Patching,
    Building,
    // Success (green)
    Installed,
    Finished,
    // Info (blue)
    Cached,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Fetching => "Fetching",
            Status::Extracting => "Extracting",
            Status::Patching => "Patching",
            Status::Building => "Building",
            Status::Installed => "Installed",
            Status::Finished => "Finished",
            Status::Cached => "Cached",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Fetching | Status::Extracting | Status::Patching | Status::Building => {
                "\x1b[1;36m"
            }
            Status::Installed | Status::Finished => "\x1b[1;32m",
            Status::Cached => "\x1b[1;34m",
        }
    }
}

/// Shell output handle. Cheap to clone around the orchestrator.
#[derive(Debug, Clone)]
pub struct Shell {
    verbosity: Verbosity,
    color: bool,
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal)
    }
}

impl Shell {
    /// Create a shell with the given verbosity; color is auto-detected.
    pub fn new(verbosity: Verbosity) -> Self {
        Shell {
            verbosity,
            color: io::stderr().is_terminal(),
        }
    }

    /// Force color output on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Print a right-aligned status line, e.g. `   Fetching perl 5.40.0`.
    pub fn status(&self, status: Status, message: impl AsRef<str>) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let mut err = io::stderr().lock();
        let _ = if self.color {
            writeln!(
                err,
                "{}{:>12}\x1b[0m {}",
                status.color_code(),
                status.as_str(),
                message.as_ref()
            )
        } else {
            writeln!(err, "{:>12} {}", status.as_str(), message.as_ref())
        };
    }

    /// Start a spinner for a long-running local operation.
    ///
    /// Returns a disabled bar when spinners would garble output (quiet,
    /// verbose, or non-terminal stderr). Callers must `finish_and_clear`.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.verbosity != Verbosity::Normal || !io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(Status::Fetching.as_str(), "Fetching");
        assert_eq!(Status::Extracting.as_str(), "Extracting");
        assert_eq!(Status::Installed.as_str(), "Installed");
    }

    #[test]
    fn test_quiet_suppresses_spinner() {
        let shell = Shell::new(Verbosity::Quiet);
        let bar = shell.spinner("working");
        assert!(bar.is_hidden());
        bar.finish_and_clear();
    }
}
