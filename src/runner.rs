// src/runner.rs

//! Top-level task list execution.
//!
//! Stages run strictly in order; each stage is handed to a fresh
//! [`JobQueue`] and must drain completely (success or abort) before the next
//! stage starts. Job and result objects never cross a stage boundary.

use std::time::Duration;

use tracing::{info, warn};

use crate::command::{Command, ParamTable};
use crate::config::model::{StageConfig, TaskDef, TaskEntry, TaskList};
use crate::errors::{Error, Result};
use crate::remote::{LocalTarget, MockTarget, SshTarget, Target};
use crate::sched::{Job, JobQueue, QueueLimits, StageReport};

/// How targets are resolved for jobs.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Production: `remote_host` tasks go over ssh, hostless tasks run
    /// locally.
    Ssh { default_user: String },
    /// Every job talks to the given scripted mock, regardless of host.
    Mock(MockTarget),
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub transport: Transport,
    /// Scheduler tick for every stage queue.
    pub tick: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            transport: Transport::Ssh {
                default_user: "deploy".to_string(),
            },
            tick: Duration::from_secs(1),
        }
    }
}

/// Aggregated outcome of a fully successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub tasklist: String,
    pub stages: Vec<StageReport>,
}

impl RunSummary {
    pub fn total_jobs(&self) -> usize {
        self.stages.iter().map(|s| s.results.len()).sum()
    }
}

/// Drives a validated task list to completion.
pub struct Runner {
    tasklist: TaskList,
    options: RunnerOptions,
}

impl Runner {
    pub fn new(tasklist: TaskList, options: RunnerOptions) -> Self {
        Self { tasklist, options }
    }

    /// Run all stages in order.
    ///
    /// Returns an error if the task list has no stages, or with
    /// [`Error::StageFailed`] naming the failed and never-attempted jobs of
    /// the first stage that did not succeed. There is no resumption; a new
    /// run starts over from the first stage.
    pub async fn run(self) -> Result<RunSummary> {
        if self.tasklist.stages.is_empty() {
            return Err(Error::EmptyTaskList);
        }

        let mut reports = Vec::with_capacity(self.tasklist.stages.len());

        for (ordinal, stage) in self.tasklist.stages.iter().enumerate() {
            if stage.tasks.is_empty() {
                info!(stage = %stage.name, ordinal, "stage has no tasks; treating as completed");
                reports.push(StageReport::empty(&stage.name));
                continue;
            }

            info!(
                tasklist = %self.tasklist.name,
                stage = %stage.name,
                ordinal,
                tasks = stage.all_tasks().count(),
                "starting stage"
            );

            let report = match self.build_stage_jobs(stage) {
                Ok(jobs) => {
                    let limits = stage_limits(stage, self.options.tick);
                    JobQueue::new(&stage.name, limits).run(jobs).await
                }
                Err(report) => {
                    // A command failed validation while the jobs were being
                    // built: that job is failed, everything else in the
                    // stage was never attempted.
                    warn!(stage = %stage.name, "stage not started; a command failed validation");
                    report
                }
            };

            let ok = report.succeeded();
            let failed = report.failed_ids();
            let not_run = report.not_run_ids();
            reports.push(report);

            if !ok {
                return Err(Error::StageFailed {
                    stage: stage.name.clone(),
                    failed,
                    not_run,
                });
            }
        }

        info!(tasklist = %self.tasklist.name, stages = reports.len(), "task list completed");
        Ok(RunSummary {
            tasklist: self.tasklist.name.clone(),
            stages: reports,
        })
    }

    /// Resolve a stage's task entries into jobs, turning chains into
    /// `depends_on` links.
    ///
    /// On a command validation failure, returns a ready-made failure report:
    /// the offending job is `Failed`, every other job `NotRun`.
    fn build_stage_jobs(&self, stage: &StageConfig) -> std::result::Result<Vec<Job>, StageReport> {
        let mut planned: Vec<(String, Option<String>, &TaskDef)> = Vec::new();
        let mut index = 0usize;

        for entry in &stage.tasks {
            let mut prev: Option<String> = None;
            let chained = matches!(entry, TaskEntry::Chain(_));
            for def in entry.defs() {
                let id = job_id(index, def);
                planned.push((id.clone(), prev.take(), def));
                if chained {
                    prev = Some(id);
                }
                index += 1;
            }
        }

        let mut jobs = Vec::with_capacity(planned.len());
        for (id, depends_on, def) in &planned {
            let params = ParamTable::new(&def.command, def.params.clone());
            match Command::build(&def.command, &params) {
                Ok(command) => jobs.push(Job {
                    id: id.clone(),
                    host_affinity: host_affinity(def),
                    depends_on: depends_on.clone(),
                    command,
                    target: self.resolve_target(def),
                    tag: def.tag.clone(),
                }),
                Err(err) => {
                    warn!(stage = %stage.name, job = %id, error = %err, "command validation failed");
                    return Err(validation_failure_report(&stage.name, id, &planned));
                }
            }
        }

        Ok(jobs)
    }

    fn resolve_target(&self, def: &TaskDef) -> Target {
        match &self.options.transport {
            Transport::Mock(mock) => Target::Mock(mock.clone()),
            Transport::Ssh { default_user } => match &def.remote_host {
                None => Target::Local(LocalTarget::new()),
                Some(host) => Target::Ssh(SshTarget::new(
                    host,
                    def.remote_user.as_deref().unwrap_or(default_user),
                )),
            },
        }
    }
}

fn stage_limits(stage: &StageConfig, tick: Duration) -> QueueLimits {
    let mut limits = QueueLimits::new(stage.concurrency).tick(tick);
    if let Some(cap) = stage.concurrency_per_host {
        limits = limits.per_host(cap);
    }
    limits
}

fn host_affinity(def: &TaskDef) -> String {
    def.remote_host
        .clone()
        .unwrap_or_else(|| "local".to_string())
}

fn job_id(index: usize, def: &TaskDef) -> String {
    format!("{index:02}:{}@{}", def.command, host_affinity(def))
}

fn validation_failure_report(
    stage: &str,
    failed_id: &str,
    planned: &[(String, Option<String>, &TaskDef)],
) -> StageReport {
    use crate::sched::{JobResult, JobStatus};

    let mut report = StageReport::empty(stage);
    report.aborted = true;
    for (id, _, _) in planned {
        let status = if id == failed_id {
            JobStatus::Failed
        } else {
            JobStatus::NotRun
        };
        report.results.insert(
            id.clone(),
            JobResult {
                job_id: id.clone(),
                status,
            },
        );
    }
    report
}
