// src/config/validate.rs

//! Structural validation of a loaded task list.
//!
//! Everything here runs before any remote side effect: stage shape, command
//! names, and the parameters of every command (by attempting construction).
//! A bad task list fails fast instead of failing halfway into a deployment.

use std::collections::HashSet;

use tracing::warn;

use crate::command::{Command, ParamTable};
use crate::config::model::{TaskDef, TaskList};
use crate::errors::{Error, Result};

pub fn validate_tasklist(tl: &TaskList) -> Result<()> {
    if tl.name.trim().is_empty() {
        return Err(Error::Config("task list name must not be empty".into()));
    }

    let mut seen = HashSet::new();
    for stage in &tl.stages {
        if stage.name.trim().is_empty() {
            return Err(Error::Config("stage name must not be empty".into()));
        }
        if !seen.insert(stage.name.as_str()) {
            return Err(Error::Config(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }

        if stage.concurrency == 0 {
            warn!(
                stage = %stage.name,
                "concurrency of 0 will be normalized to 1 at execution time"
            );
        }
        if stage.concurrency_per_host == Some(0) {
            return Err(Error::Config(format!(
                "stage '{}': concurrency_per_host must be >= 1 when set",
                stage.name
            )));
        }

        for entry in &stage.tasks {
            if entry.defs().is_empty() {
                return Err(Error::Config(format!(
                    "stage '{}': a dependency chain must contain at least one task",
                    stage.name
                )));
            }
            for def in entry.defs() {
                validate_task(&stage.name, def)?;
            }
        }
    }

    Ok(())
}

fn validate_task(stage: &str, def: &TaskDef) -> Result<()> {
    if !Command::is_known(&def.command) {
        return Err(Error::Config(format!(
            "stage '{stage}': unknown command '{}'",
            def.command
        )));
    }

    // Dry-construct the command so parameter problems surface at load time.
    let params = ParamTable::new(&def.command, def.params.clone());
    Command::build(&def.command, &params).map_err(|e| {
        Error::Config(format!(
            "stage '{stage}', host '{}': {e}",
            def.remote_host.as_deref().unwrap_or("local")
        ))
    })?;

    Ok(())
}
