// src/remote/ssh.rs

//! SSH transport built on the system `ssh`/`scp` binaries.
//!
//! Transient connection failures are retried with a short backoff; remote
//! command failures are never retried (the outcome belongs to the command's
//! contract, not the transport).

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ExecOutput, shell_quote};

const MAX_ATTEMPTS: u32 = 3;
// Delay in seconds before retry attempt N.
const RETRY_BACKOFF_SECS: [u64; 3] = [0, 2, 5];

#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
}

impl SshTarget {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options for non-interactive use: fail instead of prompting, and give
    /// up on stalled connections.
    fn batch_options(cmd: &mut Command) {
        cmd.args([
            "-o",
            "BatchMode=yes",
            "-o",
            "ConnectTimeout=10",
            "-o",
            "ServerAliveInterval=15",
            "-o",
            "ServerAliveCountMax=3",
        ]);
    }

    pub async fn execute(&self, command_line: &str, use_sudo: bool) -> ExecOutput {
        let remote_cmd = if use_sudo {
            format!("sudo -n {command_line}")
        } else {
            command_line.to_string()
        };

        debug!(host = %self.host, command = %remote_cmd, "ssh execute");
        self.run_with_retry(
            || {
                let mut cmd = Command::new("ssh");
                Self::batch_options(&mut cmd);
                cmd.arg(self.destination()).arg(&remote_cmd);
                cmd
            },
            is_transient_exec_error,
        )
        .await
    }

    pub async fn file_exists(&self, path: &str) -> bool {
        self.execute(&format!("test -e {}", shell_quote(path)), false)
            .await
            .success
    }

    pub async fn put(&self, local_path: &str, remote_dir: &str) -> ExecOutput {
        debug!(host = %self.host, local = %local_path, dir = %remote_dir, "scp put");
        self.run_with_retry(
            || {
                let mut cmd = Command::new("scp");
                Self::batch_options(&mut cmd);
                cmd.arg(local_path)
                    .arg(format!("{}:{}/", self.destination(), remote_dir));
                cmd
            },
            is_transient_copy_error,
        )
        .await
    }

    pub async fn get(&self, remote_path: &str, local_path: &str) -> ExecOutput {
        debug!(host = %self.host, remote = %remote_path, local = %local_path, "scp get");
        self.run_with_retry(
            || {
                let mut cmd = Command::new("scp");
                Self::batch_options(&mut cmd);
                cmd.arg(format!("{}:{}", self.destination(), remote_path))
                    .arg(local_path);
                cmd
            },
            is_transient_copy_error,
        )
        .await
    }

    async fn run_with_retry<F>(&self, mut build: F, is_transient: fn(&ExecOutput) -> bool) -> ExecOutput
    where
        F: FnMut() -> Command,
    {
        for attempt in 0..MAX_ATTEMPTS {
            let out = run_process(build()).await;

            // Only retry on transient connection errors, not command failures.
            if out.success || attempt + 1 >= MAX_ATTEMPTS || !is_transient(&out) {
                return out;
            }

            let delay = RETRY_BACKOFF_SECS
                .get(attempt as usize + 1)
                .copied()
                .unwrap_or(5);
            warn!(
                host = %self.host,
                attempt = attempt + 1,
                max_attempts = MAX_ATTEMPTS,
                delay_secs = delay,
                "transient ssh failure; retrying"
            );
            sleep(Duration::from_secs(delay)).await;
        }

        ExecOutput::failure("ssh retry attempts exhausted")
    }
}

async fn run_process(mut cmd: Command) -> ExecOutput {
    cmd.stdin(Stdio::null());
    match cmd.output().await {
        Ok(out) => ExecOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => ExecOutput::failure(format!("process error: {e}")),
    }
}

/// Transient classification for `ssh host cmd`.
///
/// Once the connection is up, the exit code and stderr belong to the remote
/// command, so its output must never trigger a re-execution (a failing remote
/// `curl` also prints "Connection refused"). SSH reserves exit 255 for its own
/// connection failures, and that is the only retry signal here.
fn is_transient_exec_error(output: &ExecOutput) -> bool {
    output.exit_code == 255
}

/// Transient classification for `scp` transfers.
///
/// A transfer has no remote command whose output could be confused with the
/// transport's, so stderr heuristics are safe in addition to exit 255 (scp
/// reports most failures, including "No such file or directory", as exit 1).
fn is_transient_copy_error(output: &ExecOutput) -> bool {
    if output.exit_code == 255 {
        return true;
    }

    let stderr = output.stderr.to_lowercase();
    let transient_patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "connection closed by remote host",
    ];
    transient_patterns.iter().any(|p| stderr.contains(p))
}
