//! Status messages tagged `[O]`.

use owo_colors::Style;

use super::paint;

pub(crate) const ORCHESTRATOR_TAG: &str = "[O]";

fn tag() -> String {
    paint(ORCHESTRATOR_TAG, Style::new().magenta().bold())
}

/// Print a success message.
///
/// ```no_run
/// use flux_cli::ui::success;
///
/// success("Backend ready on :3002");
/// ```
pub fn success(message: &str) {
    eprintln!("{} ✅ {}", tag(), paint(message, Style::new().green()));
}

/// Print an info message.
pub fn info(message: &str) {
    eprintln!("{} 🔹 {}", tag(), message);
}

/// Print a warning message.
pub fn warning(message: &str) {
    eprintln!("{} ⚠️  {}", tag(), paint(message, Style::new().yellow()));
}

/// Print an error message.
pub fn error(message: &str) {
    eprintln!("{} ❌ {}", tag(), paint(message, Style::new().red()));
}

/// Print a debug message (only if RUST_LOG is set).
pub fn debug(message: &str) {
    if std::env::var("RUST_LOG").is_ok() {
        eprintln!("{} 🔍 {}", tag(), paint(message, Style::new().dimmed()));
    }
}
