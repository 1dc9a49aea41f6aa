// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::TaskList;
use crate::config::validate::validate_tasklist;
use crate::errors::Result;

/// Read and parse a task list file without semantic validation.
///
/// Use [`load_and_validate`] unless you have a reason not to.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<TaskList> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading task list at {:?}", path))?;

    let tasklist: TaskList = toml::from_str(&contents)?;
    Ok(tasklist)
}

/// Load a task list from a path and validate it structurally: stage shape,
/// command names, and every command's parameters.
///
/// This is the recommended entry point; after it succeeds, the only runtime
/// failures left are remote ones.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskList> {
    let tasklist = load_from_path(&path)?;
    validate_tasklist(&tasklist)?;
    Ok(tasklist)
}
