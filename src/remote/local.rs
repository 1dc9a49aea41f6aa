// src/remote/local.rs

//! Local execution target, used for tasks without a `remote_host`.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{ExecOutput, shell_quote};

#[derive(Debug, Clone, Default)]
pub struct LocalTarget;

impl LocalTarget {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, command_line: &str, use_sudo: bool) -> ExecOutput {
        let line = if use_sudo && !cfg!(windows) {
            format!("sudo -n {command_line}")
        } else {
            command_line.to_string()
        };

        debug!(command = %line, "local execute");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };
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

    pub async fn file_exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn put(&self, local_path: &str, remote_dir: &str) -> ExecOutput {
        self.execute(
            &format!(
                "mkdir -p {dir} && cp {src} {dir}/",
                dir = shell_quote(remote_dir),
                src = shell_quote(local_path)
            ),
            false,
        )
        .await
    }

    pub async fn get(&self, remote_path: &str, local_path: &str) -> ExecOutput {
        self.execute(
            &format!(
                "cp {} {}",
                shell_quote(remote_path),
                shell_quote(local_path)
            ),
            false,
        )
        .await
    }
}
