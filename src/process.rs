//! External command execution used by the AWS, storage and builder adapters.

use std::ffi::OsString;
use std::process::Command;
use std::sync::Arc;

use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human readable exit status, `unknown` when the process was killed.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Raised when a command cannot be started at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to spawn {program}: {message}")]
pub struct SpawnError {
    /// Program that could not be started.
    pub program: String,
    /// Operating system error message.
    pub message: String,
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError> {
        (**self).run(program, args)
    }
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError> {
        debug!(command = %render_command(program, args), "running");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| SpawnError {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Returns captured stdout when `output` reports success, otherwise a
/// message naming `program`, its exit status and trimmed stderr.
///
/// # Errors
///
/// Returns the rendered failure message for non-zero or missing exit codes.
pub fn success_stdout(program: &str, output: CommandOutput) -> Result<String, String> {
    if output.is_success() {
        return Ok(output.stdout);
    }
    let detail = output.stderr.trim();
    let status = output.status_text();
    if detail.is_empty() {
        Err(format!("{program} exited with status {status}"))
    } else {
        Err(format!("{program} exited with status {status}: {detail}"))
    }
}

/// Renders a shell-escaped command line for diagnostics.
#[must_use]
pub fn render_command(program: &str, args: &[OsString]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        let text = arg.to_string_lossy();
        rendered.push_str(escape(text).as_ref());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_command_escapes_arguments() {
        let args = vec![OsString::from("s3"), OsString::from("a b")];
        assert_eq!(render_command("aws", &args), "aws s3 'a b'");
    }

    #[test]
    fn success_stdout_quotes_stderr_on_failure() {
        let output = CommandOutput {
            code: Some(254),
            stdout: String::new(),
            stderr: String::from("An error occurred (AccessDenied)\n"),
        };
        let err = success_stdout("aws", output).expect_err("non-zero exit");
        assert_eq!(
            err,
            "aws exited with status 254: An error occurred (AccessDenied)"
        );
    }

    #[test]
    fn status_text_reports_unknown_without_code() {
        let output = CommandOutput {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.status_text(), "unknown");
        assert!(!output.is_success());
    }
}
