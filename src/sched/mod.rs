// src/sched/mod.rs

//! Stage scheduling: jobs, results, and the bounded-concurrency queue.

pub mod job;
pub mod queue;

pub use job::{Job, JobResult, JobStatus, StageReport};
pub use queue::{JobQueue, QueueLimits};
