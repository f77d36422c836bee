//! Terminal UI utilities for orchestrator output.
//!
//! Every line the orchestrator prints carries a source tag: `[O]` for the
//! orchestrator itself, `[F]` for the frontend dev server and `[B]` for the
//! backend. Status messages add an emoji severity marker after the tag.
//!
//! # Examples
//!
//! ```no_run
//! use flux_cli::ui;
//!
//! ui::init_colors(false);
//! ui::info("Starting frontend...");
//! ui::success("Backend ready on :3002");
//! ```

mod format;
mod messages;
mod spinner;

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Style};

pub use format::{child_line, format_child_line, format_duration, print_urls};
pub use messages::{debug, error, info, success, warning};
pub use spinner::Spinner;

static COLORS: AtomicBool = AtomicBool::new(false);

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended()
}

/// Decide once whether output is colored. `no_color` (the `--no-color`
/// flag) always wins.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Apply `style` when colors are enabled.
pub(crate) fn paint(text: &str, style: Style) -> String {
    if colors_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
