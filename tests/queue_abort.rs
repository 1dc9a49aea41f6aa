use std::collections::BTreeMap;
use std::time::Duration;

use rollout::command::{Command, ParamTable};
use rollout::remote::{MockTarget, Target};
use rollout::sched::{Job, JobQueue, JobStatus, QueueLimits};

fn control_job(id: &str, host: &str, cmd: &str, dep: Option<&str>, mock: &MockTarget) -> Job {
    let mut params = BTreeMap::new();
    params.insert(
        "control_command".to_string(),
        toml::Value::String(cmd.to_string()),
    );
    let command = Command::build(
        "control_service",
        &ParamTable::new("control_service", params),
    )
    .expect("valid control_service params");

    Job {
        id: id.to_string(),
        host_affinity: host.to_string(),
        depends_on: dep.map(str::to_string),
        command,
        target: Target::Mock(mock.clone()),
        tag: None,
    }
}

fn fast_limits(concurrency: usize) -> QueueLimits {
    QueueLimits::new(concurrency).tick(Duration::from_millis(5))
}

/// Jobs that were already running when the failure surfaced are allowed to
/// finish, and their real results are recorded.
#[tokio::test]
async fn running_jobs_drain_after_a_failure() {
    let mock = MockTarget::new();
    mock.stub_with_delay("boom", "", 1, Duration::from_millis(10));
    for cmd in ["ok-2", "ok-3", "ok-4"] {
        mock.stub_with_delay(cmd, "", 0, Duration::from_millis(80));
    }

    let jobs = vec![
        control_job("j1", "h1", "boom", None, &mock),
        control_job("j2", "h2", "ok-2", None, &mock),
        control_job("j3", "h3", "ok-3", None, &mock),
        control_job("j4", "h4", "ok-4", None, &mock),
    ];

    // Concurrency 5: everything is admitted before j1 fails.
    let report = JobQueue::new("push", fast_limits(5)).run(jobs).await;

    assert!(!report.succeeded());
    assert!(report.aborted);
    assert_eq!(report.status_of("j1"), Some(JobStatus::Failed));
    for id in ["j2", "j3", "j4"] {
        assert_eq!(report.status_of(id), Some(JobStatus::Succeeded));
    }
    assert!(report.not_run_ids().is_empty());
    assert_eq!(report.failed_ids(), vec!["j1".to_string()]);
}

/// Once a failure has been observed, nothing else is admitted — not even a
/// job whose dependency completes successfully during the drain.
#[tokio::test]
async fn no_admission_during_the_drain() {
    let mock = MockTarget::new();
    mock.stub_with_delay("slow-ok", "", 0, Duration::from_millis(100));
    mock.stub_with_delay("boom", "", 1, Duration::from_millis(10));

    let jobs = vec![
        control_job("a", "h1", "slow-ok", None, &mock),
        control_job("b", "h1", "cmd-b", Some("a"), &mock),
        control_job("c", "h2", "boom", None, &mock),
    ];

    let report = JobQueue::new("push", fast_limits(2)).run(jobs).await;

    assert!(!report.succeeded());
    assert_eq!(report.status_of("a"), Some(JobStatus::Succeeded));
    assert_eq!(report.status_of("c"), Some(JobStatus::Failed));
    // b became eligible while the stage was draining; it must stay unrun.
    assert_eq!(report.status_of("b"), Some(JobStatus::NotRun));
    assert!(!mock.calls().iter().any(|c| c.contains("cmd-b")));
}

/// A crashed execution unit never reports a result; the queue records the
/// job as failed and aborts the stage like any other failure, and the jobs
/// around it are unaffected.
#[tokio::test]
async fn panicking_job_is_contained_and_recorded_as_failed() {
    let mock = MockTarget::new();
    mock.panic_matching("kaboom");
    mock.stub_with_delay("ok-2", "", 0, Duration::from_millis(60));

    let jobs = vec![
        control_job("j1", "h1", "kaboom", None, &mock),
        control_job("j2", "h2", "ok-2", None, &mock),
        control_job("j3", "h3", "ok-3", None, &mock),
    ];

    let report = JobQueue::new("push", fast_limits(2)).run(jobs).await;

    assert!(!report.succeeded());
    assert!(report.aborted);
    assert_eq!(report.status_of("j1"), Some(JobStatus::Failed));
    // The job that was running alongside the crash still finishes normally.
    assert_eq!(report.status_of("j2"), Some(JobStatus::Succeeded));
    assert_eq!(report.status_of("j3"), Some(JobStatus::NotRun));
    assert!(!mock.calls().iter().any(|c| c.contains("ok-3")));
}

/// With concurrency 1, a failure leaves everything behind it unadmitted.
#[tokio::test]
async fn queued_jobs_are_reported_not_run_after_abort() {
    let mock = MockTarget::new();
    mock.fail_matching("boom");

    let jobs = vec![
        control_job("j1", "h1", "boom", None, &mock),
        control_job("j2", "h1", "ok-2", None, &mock),
        control_job("j3", "h1", "ok-3", None, &mock),
    ];

    let report = JobQueue::new("push", fast_limits(1)).run(jobs).await;

    assert!(!report.succeeded());
    assert_eq!(report.status_of("j1"), Some(JobStatus::Failed));
    assert_eq!(report.status_of("j2"), Some(JobStatus::NotRun));
    assert_eq!(report.status_of("j3"), Some(JobStatus::NotRun));
    assert_eq!(
        report.not_run_ids(),
        vec!["j2".to_string(), "j3".to_string()]
    );
}
