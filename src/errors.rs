// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Failures that happen *inside* a job never cross job boundaries as errors;
//! they are recorded in the stage's result map and surface here only in
//! aggregate, as [`Error::StageFailed`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or structurally invalid task list. Raised before any remote
    /// side effect.
    #[error("configuration error: {0}")]
    Config(String),

    /// The task list has no stages at all.
    #[error("task list is empty (no stages)")]
    EmptyTaskList,

    /// A command's required parameters are missing or invalid.
    #[error("command '{command}': {reason}")]
    CommandValidation { command: String, reason: String },

    /// A stage failed. Distinguishes jobs that ran and failed from jobs that
    /// were never attempted because admission had already stopped.
    #[error(
        "stage '{stage}' failed: {} job(s) failed ({}), {} not run ({})",
        failed.len(),
        failed.join(", "),
        not_run.len(),
        not_run.join(", ")
    )]
    StageFailed {
        stage: String,
        failed: Vec<String>,
        not_run: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failed_display_lists_job_ids() {
        let err = Error::StageFailed {
            stage: "restart".into(),
            failed: vec!["00:control_service@web01".into()],
            not_run: vec!["01:check_service@web01".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("restart"));
        assert!(msg.contains("00:control_service@web01"));
        assert!(msg.contains("01:check_service@web01"));
    }
}
