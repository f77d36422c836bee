//! Formatting for child output, durations and the startup banner.

use console::Term;
use owo_colors::Style;
use std::time::Duration;

use super::paint;
use crate::dev::ChildKind;

/// Render one child output line with its colored source tag.
pub fn format_child_line(kind: ChildKind, line: &str) -> String {
    let style = match kind {
        ChildKind::Frontend => Style::new().cyan().bold(),
        ChildKind::Backend => Style::new().green().bold(),
    };
    format!("{} {}", paint(kind.tag(), style), line)
}

/// Print one child output line to stdout.
pub fn child_line(kind: ChildKind, line: &str) {
    println!("{}", format_child_line(kind, line));
}

/// Format duration in human-readable format.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flux_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Print the "ready" banner with the single-origin URL and the upstreams.
pub fn print_urls(name: &str, proxy: u16, frontend: u16, backend: u16, elapsed: Duration) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 60);
    let rule = "─".repeat(width);
    let url = format!("http://localhost:{proxy}");

    eprintln!("{}", paint(&rule, Style::new().dimmed()));
    eprintln!(
        "  {} ready in {}",
        paint(name, Style::new().bold()),
        format_duration(elapsed)
    );
    eprintln!();
    eprintln!(
        "  ➜  App:      {}",
        paint(&url, Style::new().cyan().bold().underline())
    );
    eprintln!(
        "  ➜  API:      {}",
        paint(&format!("{url}/api"), Style::new().cyan())
    );
    eprintln!(
        "  ➜  Frontend: {}",
        paint(&format!("http://localhost:{frontend}"), Style::new().dimmed())
    );
    eprintln!(
        "  ➜  Backend:  {}",
        paint(&format!("http://localhost:{backend}"), Style::new().dimmed())
    );
    eprintln!("{}", paint(&rule, Style::new().dimmed()));
}
