//! Capture and replay of child output across restart windows.
//!
//! While a window is open, child lines are buffered instead of printed so a
//! restart's build output appears as one contiguous block once the backend
//! is back. Printing happens under the same lock that guards the buffer, so
//! a replay is never interleaved with live lines.

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::ChildKind;
use crate::ui;

/// Lines kept per window. Once full, later lines are dropped so the head of
/// a build error survives.
pub const CAPTURE_CAPACITY: usize = 100;

/// One buffered child line.
///
/// The console tag and its color are not stored. Both follow from `kind`
/// ([`ChildKind::tag`]) and are applied by [`ui::format_child_line`] when
/// the line is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: SystemTime,
    pub kind: ChildKind,
    pub line: String,
}

#[derive(Debug, Default)]
struct CaptureBuffer {
    capturing: bool,
    entries: VecDeque<LogEntry>,
}

#[derive(Debug, Default)]
pub struct LogCapture {
    inner: RwLock<CaptureBuffer>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window, discarding anything left from the previous one.
    pub fn start(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.capturing = true;
    }

    /// Close the window without printing.
    pub fn stop(&self) {
        self.inner.write().capturing = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.inner.read().capturing
    }

    /// Route one child line: buffer it inside a window, print it otherwise.
    pub fn emit(&self, kind: ChildKind, line: &str) {
        let mut inner = self.inner.write();
        if inner.capturing {
            if inner.entries.len() >= CAPTURE_CAPACITY {
                return;
            }
            inner.entries.push_back(LogEntry {
                at: SystemTime::now(),
                kind,
                line: line.to_string(),
            });
        } else {
            ui::child_line(kind, line);
        }
    }

    /// Print the buffered lines in arrival order.
    pub fn replay(&self) {
        let inner = self.inner.read();
        for entry in &inner.entries {
            ui::child_line(entry.kind, &entry.line);
        }
    }

    /// Replay and close in one step.
    pub fn finish(&self) {
        let mut inner = self.inner.write();
        for entry in &inner.entries {
            ui::child_line(entry.kind, &entry.line);
        }
        inner.entries.clear();
        inner.capturing = false;
    }

    /// Copy of the buffered entries.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.inner.read().entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(capture: &LogCapture) -> Vec<String> {
        capture.snapshot().into_iter().map(|e| e.line).collect()
    }

    #[test]
    fn lines_outside_a_window_are_not_buffered() {
        let capture = LogCapture::new();
        capture.emit(ChildKind::Backend, "listening on :3002");
        assert!(capture.snapshot().is_empty());
    }

    #[test]
    fn window_buffers_in_order() {
        let capture = LogCapture::new();
        capture.start();
        capture.emit(ChildKind::Backend, "compiling");
        capture.emit(ChildKind::Frontend, "hmr update /src/App.tsx");
        capture.emit(ChildKind::Backend, "listening on :3002");

        let entries = capture.snapshot();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].kind, ChildKind::Frontend);
        assert!(ui::format_child_line(entries[0].kind, &entries[0].line).contains("[B]"));
        assert!(ui::format_child_line(entries[1].kind, &entries[1].line).contains("[F]"));
        assert_eq!(
            lines(&capture),
            vec!["compiling", "hmr update /src/App.tsx", "listening on :3002"]
        );
    }

    #[test]
    fn full_window_drops_later_lines() {
        let capture = LogCapture::new();
        capture.start();
        for i in 0..(CAPTURE_CAPACITY + 25) {
            capture.emit(ChildKind::Backend, &format!("line {i}"));
        }

        let kept = lines(&capture);
        assert_eq!(kept.len(), CAPTURE_CAPACITY);
        assert_eq!(kept.first().map(String::as_str), Some("line 0"));
        assert_eq!(
            kept.last().map(String::as_str),
            Some(format!("line {}", CAPTURE_CAPACITY - 1).as_str())
        );
    }

    #[test]
    fn start_discards_previous_window() {
        let capture = LogCapture::new();
        capture.start();
        capture.emit(ChildKind::Backend, "stale");
        capture.stop();
        capture.start();
        assert!(capture.snapshot().is_empty());
    }

    #[test]
    fn stop_closes_the_window() {
        let capture = LogCapture::new();
        capture.start();
        capture.stop();
        capture.emit(ChildKind::Backend, "after stop");
        assert!(!capture.is_capturing());
        assert!(capture.snapshot().is_empty());
    }

    #[test]
    fn finish_replays_and_closes() {
        let capture = LogCapture::new();
        capture.start();
        capture.emit(ChildKind::Backend, "build ok");
        capture.replay();
        assert_eq!(lines(&capture), vec!["build ok"]);

        capture.finish();
        assert!(!capture.is_capturing());
        assert!(capture.snapshot().is_empty());
    }
}
