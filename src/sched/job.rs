// src/sched/job.rs

//! Job and result types for one stage execution.
//!
//! A job binds one command instance to an execution slot. Jobs are owned by
//! the queue that runs them and never outlive their stage.

use std::collections::HashMap;

use crate::command::Command;
use crate::remote::Target;

#[derive(Debug)]
pub struct Job {
    /// Unique within the stage; derived from the command's canonical name.
    pub id: String,
    /// Host (or pseudo-host such as "local") this job's per-host concurrency
    /// accounting is attributed to.
    pub host_affinity: String,
    /// Id of the job earlier in this job's dependency chain, if any.
    pub depends_on: Option<String>,
    pub command: Command,
    pub target: Target,
    /// Free-form log correlation tag from the task list.
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Never admitted: its dependency failed, or the stage aborted before
    /// it could start.
    NotRun,
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
}

/// Per-stage outcome: one result per job, plus whether admission was cut
/// short by a failure.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub results: HashMap<String, JobResult>,
    pub aborted: bool,
}

impl StageReport {
    pub fn empty(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            results: HashMap::new(),
            aborted: false,
        }
    }

    /// A stage succeeds only if every admitted job succeeded and nothing was
    /// left unadmitted.
    pub fn succeeded(&self) -> bool {
        !self.aborted
            && self
                .results
                .values()
                .all(|r| r.status == JobStatus::Succeeded)
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.ids_with(JobStatus::Failed)
    }

    pub fn not_run_ids(&self) -> Vec<String> {
        self.ids_with(JobStatus::NotRun)
    }

    fn ids_with(&self, wanted: JobStatus) -> Vec<String> {
        let mut ids: Vec<String> = self
            .results
            .values()
            .filter(|r| r.status == wanted)
            .map(|r| r.job_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn status_of(&self, job_id: &str) -> Option<JobStatus> {
        self.results.get(job_id).map(|r| r.status)
    }
}
