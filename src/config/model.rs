// src/config/model.rs

//! Task list data model as read from a TOML file (or built in memory by a
//! generator).
//!
//! ```toml
//! name = "deploy webapp 1.4.2"
//!
//! [[stages]]
//! name = "push artifacts"
//! concurrency = 4
//! concurrency_per_host = 1
//! tasks = [
//!     { command = "upload", remote_host = "web01", source = "build/app.tgz", destination = "/srv/incoming" },
//!     [
//!         { command = "upload", remote_host = "web02", source = "build/app.tgz", destination = "/srv/incoming" },
//!         { command = "unpack", remote_host = "web02", source = "/srv/incoming/app.tgz", destination = "/srv/releases/1.4.2" },
//!     ],
//! ]
//! ```
//!
//! A task entry is either a single table or an array of tables; the array
//! form is a dependency chain (each task waits for the previous one in the
//! same chain to succeed).

use std::collections::BTreeMap;

use serde::Deserialize;
use toml::Value;

/// Top-level task list. Immutable once built.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub name: String,

    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// One stage: a synchronization barrier grouping jobs that must all finish
/// before the next stage starts.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,

    /// Global ceiling on simultaneously running jobs. `0` is normalized to 1
    /// at execution time.
    pub concurrency: usize,

    /// Optional ceiling per host affinity.
    #[serde(default)]
    pub concurrency_per_host: Option<usize>,

    /// Task entries; a stage with zero tasks is a valid no-op.
    pub tasks: Vec<TaskEntry>,
}

impl StageConfig {
    /// Flat view over all task descriptors regardless of chaining.
    pub fn all_tasks(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.iter().flat_map(|entry| entry.defs().iter())
    }
}

/// Either a single task or an ordered dependency chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskEntry {
    Single(TaskDef),
    Chain(Vec<TaskDef>),
}

impl TaskEntry {
    pub fn defs(&self) -> &[TaskDef] {
        match self {
            TaskEntry::Single(def) => std::slice::from_ref(def),
            TaskEntry::Chain(defs) => defs,
        }
    }
}

/// One task descriptor.
///
/// `command`, `remote_host`, `remote_user` and `tag` are recognized on every
/// task; everything else is a command-specific parameter validated by the
/// command's constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDef {
    pub command: String,

    #[serde(default)]
    pub remote_host: Option<String>,

    #[serde(default)]
    pub remote_user: Option<String>,

    /// Free-form log correlation tag.
    #[serde(default)]
    pub tag: Option<String>,

    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_chain_entries() {
        let doc = r#"
name = "demo"

[[stages]]
name = "push"
concurrency = 2
tasks = [
    { command = "removefile", remote_host = "a", source = "/tmp/x" },
    [
        { command = "removefile", remote_host = "b", source = "/tmp/y" },
        { command = "removefile", remote_host = "b", source = "/tmp/z" },
    ],
]
"#;
        let tl: TaskList = toml::from_str(doc).unwrap();
        assert_eq!(tl.stages.len(), 1);
        let stage = &tl.stages[0];
        assert_eq!(stage.tasks.len(), 2);
        assert!(matches!(stage.tasks[0], TaskEntry::Single(_)));
        assert_eq!(stage.tasks[1].defs().len(), 2);
        assert_eq!(stage.all_tasks().count(), 3);
    }

    #[test]
    fn extra_keys_land_in_params() {
        let doc = r#"
command = "upload"
remote_host = "web01"
source = "a.tgz"
destination = "/srv"
"#;
        let def: TaskDef = toml::from_str(doc).unwrap();
        assert_eq!(def.command, "upload");
        assert_eq!(def.remote_host.as_deref(), Some("web01"));
        assert_eq!(def.params.len(), 2);
        assert!(def.params.contains_key("source"));
    }
}
