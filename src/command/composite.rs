// src/command/composite.rs

//! `deploy_and_restart`: the canonical push sequence as one composite
//! command.
//!
//! A composite is a fixed ordered list of sub-commands run sequentially
//! in-process; the first sub-command to fail stops the sequence and fails
//! the composite.

use std::path::Path;

use tracing::{info, warn};

use crate::command::Command;
use crate::command::fs_ops::{CreateDirectory, Symlink, Unpack, Upload};
use crate::command::params::ParamTable;
use crate::command::service::ControlService;
use crate::errors::{Error, Result};
use crate::remote::Target;

#[derive(Debug, Clone)]
pub struct DeployAndRestart {
    steps: Vec<Command>,
}

impl DeployAndRestart {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&[
            "source",
            "destination",
            "link_target",
            "stop_command",
            "start_command",
            "lb_disable_command",
            "lb_enable_command",
        ])?;

        let source = p.require_str("source")?;
        let destination = p.require_str("destination")?;
        let link_target = p.require_str("link_target")?;
        let stop_command = p.require_str("stop_command")?;
        let start_command = p.require_str("start_command")?;
        let lb_disable = p.opt_str("lb_disable_command")?;
        let lb_enable = p.opt_str("lb_enable_command")?;

        let artifact = Path::new(&source)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| Error::CommandValidation {
                command: "deploy_and_restart".to_string(),
                reason: format!("source '{source}' has no file name"),
            })?;

        // mkdir -> upload -> unpack -> [lb disable] -> stop -> relink -> start -> [lb enable]
        //
        // The release directory is created first so a push to a fresh host
        // (or a brand-new version directory) does not fail at the upload.
        let mut steps = vec![
            Command::CreateDirectory(CreateDirectory {
                source: destination.clone(),
                clobber: false,
            }),
            Command::Upload(Upload {
                source,
                destination: destination.clone(),
            }),
            Command::Unpack(Unpack {
                source: format!("{destination}/{artifact}"),
                destination: destination.clone(),
            }),
        ];
        if let Some(cmd) = lb_disable {
            steps.push(Command::ControlService(ControlService {
                control_command: cmd,
            }));
        }
        steps.push(Command::ControlService(ControlService {
            control_command: stop_command,
        }));
        steps.push(Command::Symlink(Symlink {
            source: destination,
            destination: link_target,
        }));
        steps.push(Command::ControlService(ControlService {
            control_command: start_command,
        }));
        if let Some(cmd) = lb_enable {
            steps.push(Command::ControlService(ControlService {
                control_command: cmd,
            }));
        }

        Ok(Self { steps })
    }

    pub fn describe(&self) -> String {
        format!("deploy_and_restart ({} steps)", self.steps.len())
    }

    pub async fn run(&self, target: &Target) -> bool {
        for (i, step) in self.steps.iter().enumerate() {
            info!(
                step = i + 1,
                total = self.steps.len(),
                what = %step.describe(),
                host = %target.host(),
                "composite step"
            );
            // Sub-commands may themselves be composites one day, so the
            // recursive call is boxed.
            if !Box::pin(step.run(target)).await {
                warn!(
                    step = i + 1,
                    what = %step.describe(),
                    host = %target.host(),
                    "composite stopped at failed step"
                );
                return false;
            }
        }
        true
    }
}
