//! External command execution for the Go toolchain.
//!
//! All invocations are argv-style (no shell string evaluation) and bounded
//! by a timeout. A non-zero exit is data, not an error: callers inspect
//! [`CommandOutput`] and decide. Errors are reserved for processes that
//! could not be launched or did not finish in time.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::RunnerError;

/// A command with arguments and an optional working directory.
///
/// Arguments are discrete elements; nothing is ever passed through a shell.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name for logs and error messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command
    }
}

/// Captured output of a completed process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, for diagnostics that want everything.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Run a command to completion, killing it when `timeout` elapses.
///
/// # Errors
///
/// [`RunnerError::Launch`] when the process cannot be spawned or its output
/// cannot be collected; [`RunnerError::Timeout`] when the deadline passes.
pub async fn run_command(
    spec: &CommandSpec,
    timeout: Duration,
) -> Result<CommandOutput, RunnerError> {
    let program = spec.display_name();

    let child = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RunnerError::Launch {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }),
        Ok(Err(e)) => Err(RunnerError::Launch {
            program,
            reason: format!("failed to collect output: {e}"),
        }),
        // The child is dropped with the future; kill_on_drop reaps it.
        Err(_) => Err(RunnerError::Timeout {
            program,
            timeout_seconds: timeout.as_secs(),
        }),
    }
}

/// Whether `program` resolves on PATH.
#[must_use]
pub fn tool_available(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_args_and_cwd() {
        let spec = CommandSpec::new("go")
            .arg("vet")
            .args(["./...", "-json"])
            .cwd("/tmp");
        assert_eq!(spec.display_name(), "go");
        assert_eq!(spec.args.len(), 3);
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/tmp")));
    }

    #[test]
    fn combined_joins_streams() {
        let output = CommandOutput {
            stdout: "line one".to_string(),
            stderr: "line two".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(output.combined(), "line one\nline two");

        let stdout_only = CommandOutput {
            stdout: "just out\n".to_string(),
            stderr: "  ".to_string(),
            exit_code: Some(0),
        };
        assert_eq!(stdout_only.combined(), "just out\n");
    }

    #[tokio::test]
    async fn echo_succeeds_and_captures_stdout() {
        let spec = CommandSpec::new("echo").arg("hello");
        let output = run_command(&spec, Duration::from_secs(5)).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let spec = CommandSpec::new("false");
        let output = run_command(&spec, Duration::from_secs(5)).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(1));
    }

    #[tokio::test]
    async fn missing_binary_reports_launch_failure() {
        let spec = CommandSpec::new("definitely-not-a-real-binary-404");
        let err = run_command(&spec, Duration::from_secs(5)).await.unwrap_err();
        match err {
            RunnerError::Launch { program, .. } => {
                assert_eq!(program, "definitely-not-a-real-binary-404");
            }
            other => panic!("expected Launch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let spec = CommandSpec::new("sleep").arg("5");
        let err = run_command(&spec, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cwd_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("pwd").cwd(dir.path());
        let output = run_command(&spec, Duration::from_secs(5)).await.unwrap();
        let reported = PathBuf::from(output.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn tool_available_finds_common_binaries() {
        assert!(tool_available("echo") || tool_available("sh"));
        assert!(!tool_available("definitely-not-a-real-binary-404"));
    }
}
