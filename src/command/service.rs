// src/command/service.rs

//! Service commands: fire-and-check control of remote daemons.
//!
//! `control_service` issues the control action; `check_service` polls the
//! reported state until it converges on the wanted value or times out.

use std::time::Duration;

use anyhow::anyhow;
use regex::Regex;
use tracing::{error, info};

use crate::command::params::ParamTable;
use crate::errors::{Error, Result};
use crate::poll::{PollOutcome, PollSpec, poll_until};
use crate::remote::{ExecOutput, Target};

const PROBE_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 30;

/// Run a service control command (start/stop/reload) under sudo.
#[derive(Debug, Clone)]
pub struct ControlService {
    pub control_command: String,
}

impl ControlService {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["control_command"])?;
        Ok(Self {
            control_command: p.require_str("control_command")?,
        })
    }

    pub fn describe(&self) -> String {
        format!("control_service {}", self.control_command)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let out = target.execute(&self.control_command, true).await;
        if out.success {
            info!(command = %self.control_command, host = %target.host(), "service control succeeded");
        } else {
            error!(
                command = %self.control_command,
                host = %target.host(),
                exit_code = out.exit_code,
                output = %out.combined(),
                "service control failed"
            );
        }
        out.success
    }
}

/// Poll a service's reported state until it matches `want_state`.
#[derive(Debug, Clone)]
pub struct CheckService {
    pub check_command: String,
    pub want_state: String,
    pub timeout: Duration,
    pub notify_interval: Duration,
    /// Optional regex with one capture group extracting the state from the
    /// check command's output. Without it, the last non-empty line is used.
    pub state_pattern: Option<Regex>,
}

impl CheckService {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&[
            "check_command",
            "want_state",
            "timeout",
            "notify_interval",
            "state_pattern",
        ])?;

        let state_pattern = match p.opt_str("state_pattern")? {
            Some(pat) => Some(Regex::new(&pat).map_err(|e| Error::CommandValidation {
                command: "check_service".to_string(),
                reason: format!("invalid state_pattern '{pat}': {e}"),
            })?),
            None => None,
        };

        Ok(Self {
            check_command: p.require_str("check_command")?,
            want_state: p.require_str("want_state")?,
            timeout: Duration::from_secs(p.require_u64("timeout")?),
            notify_interval: Duration::from_secs(
                p.opt_u64("notify_interval")?
                    .unwrap_or(DEFAULT_NOTIFY_INTERVAL_SECS),
            ),
            state_pattern,
        })
    }

    pub fn describe(&self) -> String {
        format!("check_service {} == {}", self.check_command, self.want_state)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let spec = PollSpec {
            timeout: self.timeout,
            probe_interval: PROBE_INTERVAL.min(self.timeout),
            notify_interval: self.notify_interval,
        };

        let outcome = poll_until(
            &spec,
            &self.check_command,
            || self.probe(target),
            |state: &String| state == &self.want_state,
        )
        .await;

        match outcome {
            PollOutcome::Converged(state) => {
                info!(
                    command = %self.check_command,
                    host = %target.host(),
                    state = %state,
                    "service state converged"
                );
                true
            }
            PollOutcome::TimedOut { last_observed } => {
                error!(
                    command = %self.check_command,
                    host = %target.host(),
                    want_state = %self.want_state,
                    last_observed = ?last_observed,
                    timeout_secs = self.timeout.as_secs(),
                    "service state did not converge within timeout"
                );
                false
            }
        }
    }

    async fn probe(&self, target: &Target) -> anyhow::Result<String> {
        let out = target.execute(&self.check_command, true).await;
        // A check command may exit non-zero while still reporting a state
        // (e.g. "stopped"), so the output is parsed before the exit status
        // is considered.
        match extract_state(&out, self.state_pattern.as_ref()) {
            Some(state) => Ok(state),
            None if !out.success => Err(anyhow!(
                "probe execution failed (exit {}): {}",
                out.exit_code,
                out.combined()
            )),
            None => Err(anyhow!("probe produced no parseable state")),
        }
    }
}

fn extract_state(out: &ExecOutput, pattern: Option<&Regex>) -> Option<String> {
    match pattern {
        Some(re) => out.stdout.lines().find_map(|line| {
            re.captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        }),
        None => out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .next_back()
            .map(|l| l.to_string()),
    }
}
