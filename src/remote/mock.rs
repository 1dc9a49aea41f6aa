// src/remote/mock.rs

//! Scripted mock target.
//!
//! Lives in the main tree (like the mock filesystem pattern) so integration
//! tests can run whole task lists without a network. Responses are matched by
//! substring against the executed command line; unmatched commands succeed
//! with empty output.
//!
//! The mock also tracks how many executions are in flight at once, which is
//! what the concurrency-bound tests assert against.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use super::ExecOutput;

#[derive(Debug, Clone)]
struct Script {
    needle: String,
    stdout: String,
    exit_code: i32,
    delay: Option<Duration>,
    panics: bool,
}

#[derive(Debug, Default)]
struct MockState {
    host: String,
    scripts: Vec<Script>,
    files: HashSet<String>,
    calls: Vec<String>,
    delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockTarget {
    inner: Arc<Mutex<MockState>>,
}

impl MockTarget {
    pub fn new() -> Self {
        let target = Self::default();
        target.lock().host = "mock".to_string();
        target
    }

    pub fn named(host: impl Into<String>) -> Self {
        let target = Self::default();
        target.lock().host = host.into();
        target
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Base delay applied to every execution (simulated remote latency).
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = delay;
        self
    }

    /// Script a response for any command line containing `needle`.
    pub fn stub(&self, needle: &str, stdout: &str, exit_code: i32) {
        self.lock().scripts.push(Script {
            needle: needle.to_string(),
            stdout: stdout.to_string(),
            exit_code,
            delay: None,
            panics: false,
        });
    }

    /// Script a response with its own execution delay.
    pub fn stub_with_delay(&self, needle: &str, stdout: &str, exit_code: i32, delay: Duration) {
        self.lock().scripts.push(Script {
            needle: needle.to_string(),
            stdout: stdout.to_string(),
            exit_code,
            delay: Some(delay),
            panics: false,
        });
    }

    /// Shorthand: any command line containing `needle` fails with exit 1.
    pub fn fail_matching(&self, needle: &str) {
        self.stub(needle, "", 1);
    }

    /// Any command line containing `needle` panics mid-execution, simulating
    /// a crashed execution unit rather than a failed command.
    pub fn panic_matching(&self, needle: &str) {
        self.lock().scripts.push(Script {
            needle: needle.to_string(),
            stdout: String::new(),
            exit_code: 0,
            delay: None,
            panics: true,
        });
    }

    /// Pretend a remote path exists.
    pub fn add_file(&self, path: &str) {
        self.lock().files.insert(path.to_string());
    }

    /// Every command line executed so far, in order. `put`/`get` transfers
    /// are recorded as `put <local> <dir>` / `get <remote> <local>`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Highest number of simultaneously in-flight executions observed.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn host(&self) -> String {
        self.lock().host.clone()
    }

    pub async fn execute(&self, command_line: &str, _use_sudo: bool) -> ExecOutput {
        let (response, delay) = {
            let mut state = self.lock();
            state.calls.push(command_line.to_string());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);

            let script = state
                .scripts
                .iter()
                .find(|s| command_line.contains(&s.needle))
                .cloned();
            let delay = script
                .as_ref()
                .and_then(|s| s.delay)
                .unwrap_or(state.delay);
            (script, delay)
        };

        if !delay.is_zero() {
            sleep(delay).await;
        }
        self.lock().in_flight -= 1;

        if response.as_ref().is_some_and(|s| s.panics) {
            panic!("scripted crash while executing '{command_line}'");
        }

        match response {
            Some(script) => ExecOutput {
                stdout: script.stdout,
                stderr: String::new(),
                success: script.exit_code == 0,
                exit_code: script.exit_code,
            },
            None => ExecOutput {
                stdout: String::new(),
                stderr: String::new(),
                success: true,
                exit_code: 0,
            },
        }
    }

    pub async fn file_exists(&self, path: &str) -> bool {
        self.lock().files.contains(path)
    }

    pub async fn put(&self, local_path: &str, remote_dir: &str) -> ExecOutput {
        let outcome = self.execute(&format!("put {local_path} {remote_dir}"), false).await;
        if outcome.success {
            if let Some(name) = Path::new(local_path).file_name().and_then(|n| n.to_str()) {
                self.lock().files.insert(format!("{remote_dir}/{name}"));
            }
        }
        outcome
    }

    pub async fn get(&self, remote_path: &str, local_path: &str) -> ExecOutput {
        self.execute(&format!("get {remote_path} {local_path}"), false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmatched_commands_succeed() {
        let mock = MockTarget::new();
        let out = mock.execute("echo hi", false).await;
        assert!(out.success);
        assert_eq!(mock.calls(), vec!["echo hi".to_string()]);
    }

    #[tokio::test]
    async fn stubbed_commands_match_by_substring() {
        let mock = MockTarget::new();
        mock.stub("systemctl status", "running", 0);
        mock.fail_matching("tar -xzf");

        let out = mock.execute("sudo systemctl status app", false).await;
        assert_eq!(out.stdout, "running");

        let out = mock.execute("tar -xzf /srv/app.tgz -C /srv", false).await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn put_registers_the_remote_file() {
        let mock = MockTarget::new();
        mock.put("build/app.tgz", "/srv/incoming").await;
        assert!(mock.file_exists("/srv/incoming/app.tgz").await);
    }
}
