// src/command/mod.rs

//! Command registry and dispatch.
//!
//! A command is a self-contained remote operation: parameters are validated
//! eagerly at construction (never at execution), `run` performs the side
//! effect at most once and reports a boolean outcome. A command instance
//! belongs to exactly one job and is never called concurrently with itself.

pub mod composite;
pub mod fs_ops;
pub mod params;
pub mod service;

pub use composite::DeployAndRestart;
pub use fs_ops::{Cleanup, CreateDirectory, RemoveFile, Symlink, Unpack, Upload};
pub use params::ParamTable;
pub use service::{CheckService, ControlService};

use crate::errors::{Error, Result};
use crate::remote::Target;

/// Names accepted in a task's `command` key.
pub const KNOWN_COMMANDS: &[&str] = &[
    "upload",
    "unpack",
    "createdirectory",
    "removefile",
    "symlink",
    "control_service",
    "check_service",
    "deploy_and_restart",
    "cleanup",
];

/// One unit of remote work.
#[derive(Debug, Clone)]
pub enum Command {
    Upload(Upload),
    Unpack(Unpack),
    CreateDirectory(CreateDirectory),
    RemoveFile(RemoveFile),
    Symlink(Symlink),
    Cleanup(Cleanup),
    ControlService(ControlService),
    CheckService(CheckService),
    DeployAndRestart(DeployAndRestart),
}

impl Command {
    pub fn is_known(name: &str) -> bool {
        KNOWN_COMMANDS.contains(&name)
    }

    /// Registry factory: construct (and validate) a command from its name
    /// and parameter table. Unknown names are a configuration error.
    pub fn build(name: &str, params: &ParamTable) -> Result<Command> {
        match name {
            "upload" => Ok(Command::Upload(Upload::from_params(params)?)),
            "unpack" => Ok(Command::Unpack(Unpack::from_params(params)?)),
            "createdirectory" => Ok(Command::CreateDirectory(CreateDirectory::from_params(
                params,
            )?)),
            "removefile" => Ok(Command::RemoveFile(RemoveFile::from_params(params)?)),
            "symlink" => Ok(Command::Symlink(Symlink::from_params(params)?)),
            "cleanup" => Ok(Command::Cleanup(Cleanup::from_params(params)?)),
            "control_service" => Ok(Command::ControlService(ControlService::from_params(
                params,
            )?)),
            "check_service" => Ok(Command::CheckService(CheckService::from_params(params)?)),
            "deploy_and_restart" => Ok(Command::DeployAndRestart(DeployAndRestart::from_params(
                params,
            )?)),
            other => Err(Error::Config(format!(
                "unknown command '{other}' (known: {})",
                KNOWN_COMMANDS.join(", ")
            ))),
        }
    }

    /// Canonical registry name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Upload(_) => "upload",
            Command::Unpack(_) => "unpack",
            Command::CreateDirectory(_) => "createdirectory",
            Command::RemoveFile(_) => "removefile",
            Command::Symlink(_) => "symlink",
            Command::Cleanup(_) => "cleanup",
            Command::ControlService(_) => "control_service",
            Command::CheckService(_) => "check_service",
            Command::DeployAndRestart(_) => "deploy_and_restart",
        }
    }

    /// Short human-readable form for logs and the dry-run plan.
    pub fn describe(&self) -> String {
        match self {
            Command::Upload(c) => c.describe(),
            Command::Unpack(c) => c.describe(),
            Command::CreateDirectory(c) => c.describe(),
            Command::RemoveFile(c) => c.describe(),
            Command::Symlink(c) => c.describe(),
            Command::Cleanup(c) => c.describe(),
            Command::ControlService(c) => c.describe(),
            Command::CheckService(c) => c.describe(),
            Command::DeployAndRestart(c) => c.describe(),
        }
    }

    /// Perform the remote effect. Returns `true` only if the intended effect
    /// was achieved (including any configured convergence check).
    pub async fn run(&self, target: &Target) -> bool {
        match self {
            Command::Upload(c) => c.run(target).await,
            Command::Unpack(c) => c.run(target).await,
            Command::CreateDirectory(c) => c.run(target).await,
            Command::RemoveFile(c) => c.run(target).await,
            Command::Symlink(c) => c.run(target).await,
            Command::Cleanup(c) => c.run(target).await,
            Command::ControlService(c) => c.run(target).await,
            Command::CheckService(c) => c.run(target).await,
            Command::DeployAndRestart(c) => c.run(target).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use toml::Value;

    fn params(name: &str, pairs: &[(&str, &str)]) -> ParamTable {
        let values: BTreeMap<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        ParamTable::new(name, values)
    }

    #[test]
    fn unknown_command_is_a_config_error() {
        let err = Command::build("teleport", &params("teleport", &[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_parameter_is_a_validation_error() {
        let err = Command::build("upload", &params("upload", &[("source", "a.tgz")]))
            .unwrap_err();
        assert!(matches!(err, Error::CommandValidation { .. }));
    }

    #[test]
    fn valid_upload_builds_and_describes() {
        let cmd = Command::build(
            "upload",
            &params("upload", &[("source", "a.tgz"), ("destination", "/srv")]),
        )
        .unwrap();
        assert_eq!(cmd.name(), "upload");
        assert!(cmd.describe().contains("a.tgz"));
    }
}
