// src/sched/queue.rs

//! Bounded-concurrency runner for the jobs of one stage.
//!
//! A single scheduling loop owns all bookkeeping: it admits queued jobs into
//! running slots (respecting the global and per-host ceilings and chain
//! order), polls running execution units for completion, and records results.
//! The loop never blocks on remote I/O itself; jobs run as spawned tokio
//! tasks and the loop only sleeps on its fixed tick.
//!
//! Abort semantics: the first failed result stops all further admission for
//! the stage, including jobs whose dependency completes successfully during
//! the drain. Jobs already running are left to finish naturally, so remote
//! state transitions are never abandoned unobserved.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::sched::job::{Job, JobResult, JobStatus, StageReport};

/// Concurrency limits and tick cadence for one stage.
#[derive(Debug, Clone)]
pub struct QueueLimits {
    /// Maximum simultaneously running jobs.
    pub concurrency: usize,
    /// Maximum simultaneously running jobs per host affinity (unbounded if
    /// unset).
    pub per_host: Option<usize>,
    /// Sleep between scheduling passes.
    pub tick: Duration,
}

impl QueueLimits {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            per_host: None,
            tick: Duration::from_secs(1),
        }
    }

    pub fn per_host(mut self, cap: usize) -> Self {
        self.per_host = Some(cap);
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

struct RunningJob {
    id: String,
    host: String,
    handle: JoinHandle<bool>,
}

pub struct JobQueue {
    stage: String,
    limits: QueueLimits,
}

impl JobQueue {
    pub fn new(stage: impl Into<String>, limits: QueueLimits) -> Self {
        Self {
            stage: stage.into(),
            limits,
        }
    }

    /// Run the batch to completion and report per-job results.
    pub async fn run(self, jobs: Vec<Job>) -> StageReport {
        let mut queued: Vec<Job> = jobs;
        let mut running: Vec<RunningJob> = Vec::new();
        let mut host_counts: HashMap<String, usize> = HashMap::new();
        let mut results: HashMap<String, JobResult> = HashMap::new();
        let mut aborting = false;

        info!(
            stage = %self.stage,
            jobs = queued.len(),
            concurrency = self.limits.concurrency,
            per_host = ?self.limits.per_host,
            "stage queue started"
        );

        loop {
            self.collect_finished(&mut running, &mut host_counts, &mut results, &mut aborting)
                .await;
            self.cancel_broken_chains(&mut queued, &mut results);

            if !aborting {
                self.admit(&mut queued, &mut running, &mut host_counts, &results);
            }

            if running.is_empty() {
                if aborting || !queued.is_empty() {
                    // Anything still queued was never attempted. Outside an
                    // abort this means no queued job is admissible, which a
                    // validated chain layout cannot produce.
                    if !aborting && !queued.is_empty() {
                        error!(
                            stage = %self.stage,
                            stuck = queued.len(),
                            "no running jobs and no admissible queued jobs; aborting stage"
                        );
                        aborting = true;
                    }
                    for job in queued.drain(..) {
                        debug!(stage = %self.stage, job = %job.id, "job not run");
                        results.insert(
                            job.id.clone(),
                            JobResult {
                                job_id: job.id,
                                status: JobStatus::NotRun,
                            },
                        );
                    }
                }
                if queued.is_empty() {
                    break;
                }
            }

            sleep(self.limits.tick).await;
        }

        let report = StageReport {
            stage: self.stage.clone(),
            results,
            aborted: aborting,
        };
        if report.succeeded() {
            info!(stage = %self.stage, "stage queue drained successfully");
        } else {
            warn!(
                stage = %self.stage,
                failed = ?report.failed_ids(),
                not_run = ?report.not_run_ids(),
                "stage queue drained with failures"
            );
        }
        report
    }

    /// Move finished execution units from `running` into `results`.
    ///
    /// A missing result (the execution unit panicked) is a failure; the
    /// panic stays contained to that job.
    async fn collect_finished(
        &self,
        running: &mut Vec<RunningJob>,
        host_counts: &mut HashMap<String, usize>,
        results: &mut HashMap<String, JobResult>,
        aborting: &mut bool,
    ) {
        let mut still_running = Vec::with_capacity(running.len());

        for rj in running.drain(..) {
            if !rj.handle.is_finished() {
                still_running.push(rj);
                continue;
            }

            let status = match rj.handle.await {
                Ok(true) => JobStatus::Succeeded,
                Ok(false) => JobStatus::Failed,
                Err(join_err) => {
                    error!(
                        stage = %self.stage,
                        job = %rj.id,
                        error = %join_err,
                        "job execution unit did not report a result; treating as failure"
                    );
                    JobStatus::Failed
                }
            };

            if let Some(count) = host_counts.get_mut(&rj.host) {
                *count = count.saturating_sub(1);
            }

            if status == JobStatus::Failed && !*aborting {
                warn!(
                    stage = %self.stage,
                    job = %rj.id,
                    "job failed; no further jobs will be admitted in this stage"
                );
                *aborting = true;
            }

            debug!(stage = %self.stage, job = %rj.id, status = ?status, "job reached terminal state");
            results.insert(
                rj.id.clone(),
                JobResult {
                    job_id: rj.id,
                    status,
                },
            );
        }

        *running = still_running;
    }

    /// Record `not_run` for queued jobs whose dependency has failed, so the
    /// rest of a broken chain never starts.
    fn cancel_broken_chains(&self, queued: &mut Vec<Job>, results: &mut HashMap<String, JobResult>) {
        // Repeat until settled so a whole chain collapses in one pass.
        loop {
            let mut cancelled = 0usize;
            let mut keep = Vec::with_capacity(queued.len());

            for job in queued.drain(..) {
                let dep_failed = job.depends_on.as_ref().is_some_and(|dep| {
                    matches!(
                        results.get(dep).map(|r| r.status),
                        Some(JobStatus::Failed) | Some(JobStatus::NotRun)
                    )
                });
                if dep_failed {
                    debug!(
                        stage = %self.stage,
                        job = %job.id,
                        dependency = ?job.depends_on,
                        "dependency failed; job will not run"
                    );
                    results.insert(
                        job.id.clone(),
                        JobResult {
                            job_id: job.id,
                            status: JobStatus::NotRun,
                        },
                    );
                    cancelled += 1;
                } else {
                    keep.push(job);
                }
            }

            *queued = keep;
            if cancelled == 0 {
                return;
            }
        }
    }

    /// Admit queued jobs into free slots. Admission order is not FIFO: any
    /// queued job whose limits and dependency allow it may start this tick.
    fn admit(
        &self,
        queued: &mut Vec<Job>,
        running: &mut Vec<RunningJob>,
        host_counts: &mut HashMap<String, usize>,
        results: &HashMap<String, JobResult>,
    ) {
        let mut deferred = Vec::with_capacity(queued.len());

        for job in queued.drain(..) {
            if running.len() >= self.limits.concurrency {
                deferred.push(job);
                continue;
            }

            let host_free = match self.limits.per_host {
                Some(cap) => host_counts.get(&job.host_affinity).copied().unwrap_or(0) < cap,
                None => true,
            };
            let dep_done = match &job.depends_on {
                None => true,
                Some(dep) => {
                    matches!(results.get(dep).map(|r| r.status), Some(JobStatus::Succeeded))
                }
            };

            if host_free && dep_done {
                *host_counts.entry(job.host_affinity.clone()).or_insert(0) += 1;
                running.push(self.start(job));
            } else {
                deferred.push(job);
            }
        }

        *queued = deferred;
    }

    fn start(&self, job: Job) -> RunningJob {
        let id = job.id.clone();
        let host = job.host_affinity.clone();
        info!(
            stage = %self.stage,
            job = %id,
            host = %host,
            tag = job.tag.as_deref().unwrap_or("-"),
            what = %job.command.describe(),
            "admitting job"
        );

        let handle = tokio::spawn(async move {
            let ok = job.command.run(&job.target).await;
            if ok {
                info!(job = %job.id, host = %job.host_affinity, "job succeeded");
            } else {
                warn!(job = %job.id, host = %job.host_affinity, "job failed");
            }
            ok
        });

        RunningJob { id, host, handle }
    }
}
