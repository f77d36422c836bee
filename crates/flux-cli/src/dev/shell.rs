//! One-shot commands run through the platform shell.

use std::path::Path;
use std::process::Stdio;

use super::platform::shell_invocation;

/// Outcome of a one-shot command.
#[derive(Debug)]
pub struct ShellOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    /// Last few lines of stderr (or stdout when stderr is empty), for warnings.
    pub fn tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = source.lines().filter(|l| !l.trim().is_empty()).collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Run `command` in `cwd` and collect its output.
pub async fn run(command: &str, cwd: &Path) -> std::io::Result<ShellOutput> {
    let (program, args) = shell_invocation(command);
    let output = tokio::process::Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(ShellOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_status() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = run("echo hello; echo oops >&2; exit 3", dir.path())
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.tail(5), "oops");
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = run("ls", dir.path()).await.unwrap();
        assert!(out.success);
        assert!(out.stdout.contains("marker.txt"));
    }

    #[test]
    fn tail_falls_back_to_stdout() {
        let out = ShellOutput {
            success: false,
            code: Some(1),
            stdout: "a\nb\n\nc\n".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(out.tail(2), "b\nc");
    }
}
