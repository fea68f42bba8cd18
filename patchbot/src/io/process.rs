//! Helpers for running child processes with timeouts and bounded output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, warn};
use wait_timeout::ChildExt;

/// Limits applied to every external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for ProcessLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            output_limit_bytes: 1_000_000,
        }
    }
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exited zero within the timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    pub fn failure_detail(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }
        let stderr = self.stderr_text();
        if stderr.trim().is_empty() {
            self.stdout_text().trim().to_string()
        } else {
            stderr.trim().to_string()
        }
    }
}

/// Render a command line for logs.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().to_string()));
    parts.join(" ")
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `limits.output_limit_bytes` bounds the
/// amount of stdout/stderr stored in memory (bytes beyond this are discarded while still
/// draining the pipe). A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::success`] and decide.
pub fn run_command(mut cmd: Command, limits: ProcessLimits) -> Result<CommandOutput> {
    let line = describe(&cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    info!(command = %line, "running");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(command = %line, err = %e, "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {line}"));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let limit = limits.output_limit_bytes;
    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, limit));

    let mut timed_out = false;
    let status = match child
        .wait_timeout(limits.timeout)
        .with_context(|| format!("wait for {line}"))?
    {
        Some(status) => status,
        None => {
            warn!(
                command = %line,
                timeout_secs = limits.timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    let output = CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    };
    if output.success() {
        debug!(command = %line, "command finished");
    } else {
        warn!(
            command = %line,
            exit_code = ?output.status.code(),
            timed_out,
            stderr = %output.failure_detail(),
            "command failed"
        );
    }
    Ok(output)
}

/// Run a command and turn a non-success exit into an error carrying its stderr.
pub fn run_checked(cmd: Command, limits: ProcessLimits) -> Result<CommandOutput> {
    let line = describe(&cmd);
    let output = run_command(cmd, limits)?;
    if !output.success() {
        return Err(anyhow!("{line} failed: {}", output.failure_detail()));
    }
    Ok(output)
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stream_limited_counts_truncation() {
        let data = vec![b'x'; 100];
        let (kept, truncated) = read_stream_limited(&data[..], 40).expect("read");
        assert_eq!(kept.len(), 40);
        assert_eq!(truncated, 60);
    }

    #[test]
    fn describe_joins_program_and_args() {
        let mut cmd = Command::new("gh");
        cmd.args(["pr", "list", "--author", "bot"]);
        assert_eq!(describe(&cmd), "gh pr list --author bot");
    }

    #[test]
    fn captures_failure_detail() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo boom >&2; exit 3"]);
        let output = run_command(cmd, ProcessLimits::default()).expect("run");
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.failure_detail(), "boom");
        assert_eq!(output.stdout_text().trim(), "out");
    }

    #[test]
    fn run_checked_errors_on_failure() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 1"]);
        let err = run_checked(cmd, ProcessLimits::default()).expect_err("should fail");
        assert!(err.to_string().starts_with("sh -c exit 1 failed"));
    }

    #[test]
    fn kills_on_timeout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exec sleep 5"]);
        let limits = ProcessLimits {
            timeout: Duration::from_millis(100),
            output_limit_bytes: 1024,
        };
        let output = run_command(cmd, limits).expect("run");
        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.failure_detail(), "timed out");
    }
}
