//! Spinner for long steps such as dependency installs.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::Style;
use std::time::Duration;

use super::{is_ci, paint};

/// Simple spinner for tasks without known duration.
///
/// Hidden in CI and when stderr is not a terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        let pb = if is_ci() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("[O] {spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Finish spinner with success message.
    pub fn finish(&self, message: &str) {
        self.pb
            .finish_with_message(format!("{} {}", paint("✓", Style::new().green()), message));
    }

    /// Finish spinner with error message.
    pub fn fail(&self, message: &str) {
        self.pb
            .finish_with_message(format!("{} {}", paint("✗", Style::new().red()), message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_creation() {
        let spinner = Spinner::new("Installing frontend dependencies...");
        spinner.finish("Done");
    }

    #[test]
    fn test_spinner_fail() {
        let spinner = Spinner::new("Downloading Go modules");
        spinner.fail("Failed");
    }
}
