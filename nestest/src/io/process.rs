//! Running a child process with a timeout and bounded output capture.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

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
    pub fn stdout_lossy(&self) -> String {
        with_truncation_notice(&self.stdout, self.stdout_truncated)
    }

    pub fn stderr_lossy(&self) -> String {
        with_truncation_notice(&self.stderr, self.stderr_truncated)
    }
}

fn with_truncation_notice(bytes: &[u8], truncated: usize) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated > 0 {
        text.push_str(&format!("\n[truncated {truncated} bytes]\n"));
    }
    text
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// Both pipes are drained on reader threads while the child runs so a chatty
/// child cannot deadlock on a full pipe. At most `output_limit_bytes` of each
/// stream are kept; the rest is counted and discarded.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
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

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
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

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
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
        let keep = n.min(limit.saturating_sub(buf.len()));
        buf.extend_from_slice(&chunk[..keep]);
        truncated += n - keep;
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stream_limited_counts_discarded_bytes() {
        let input: &[u8] = b"0123456789";
        let (kept, truncated) = read_stream_limited(input, 4).expect("read");
        assert_eq!(kept, b"0123");
        assert_eq!(truncated, 6);
    }

    #[test]
    fn truncation_notice_is_appended() {
        assert_eq!(with_truncation_notice(b"abc", 0), "abc");
        assert_eq!(
            with_truncation_notice(b"abc", 7),
            "abc\n[truncated 7 bytes]\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2; exit 3");
        let output =
            run_command_with_timeout(cmd, Duration::from_secs(10), 1024).expect("run sh");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
        assert!(!output.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn kills_child_after_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let output =
            run_command_with_timeout(cmd, Duration::from_millis(200), 1024).expect("run sleep");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }
}
