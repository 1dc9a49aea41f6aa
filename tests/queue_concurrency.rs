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

#[tokio::test]
async fn global_ceiling_is_never_exceeded() {
    let mock = MockTarget::new().with_delay(Duration::from_millis(40));
    let jobs = vec![
        control_job("j1", "web01", "cmd-1", None, &mock),
        control_job("j2", "web02", "cmd-2", None, &mock),
        control_job("j3", "web03", "cmd-3", None, &mock),
    ];

    let report = JobQueue::new("push", fast_limits(2)).run(jobs).await;

    assert!(report.succeeded());
    assert_eq!(report.results.len(), 3);
    for id in ["j1", "j2", "j3"] {
        assert_eq!(report.status_of(id), Some(JobStatus::Succeeded));
    }
    // Three jobs through two slots: both slots get used, never more.
    assert_eq!(mock.max_in_flight(), 2);
}

#[tokio::test]
async fn per_host_ceiling_applies_independently_of_global() {
    // One mock per host so each host's in-flight count is observable.
    let mock_a = MockTarget::named("web-a").with_delay(Duration::from_millis(30));
    let mock_b = MockTarget::named("web-b").with_delay(Duration::from_millis(30));

    let jobs = vec![
        control_job("a1", "web-a", "cmd-a1", None, &mock_a),
        control_job("a2", "web-a", "cmd-a2", None, &mock_a),
        control_job("b1", "web-b", "cmd-b1", None, &mock_b),
        control_job("b2", "web-b", "cmd-b2", None, &mock_b),
    ];

    let report = JobQueue::new("push", fast_limits(4).per_host(1))
        .run(jobs)
        .await;

    assert!(report.succeeded());
    assert_eq!(mock_a.max_in_flight(), 1);
    assert_eq!(mock_b.max_in_flight(), 1);
}

#[tokio::test]
async fn free_slot_is_refilled_as_jobs_complete() {
    let delay = Duration::from_millis(40);
    let mock = MockTarget::new().with_delay(delay);
    let jobs = vec![
        control_job("j1", "h1", "cmd-1", None, &mock),
        control_job("j2", "h2", "cmd-2", None, &mock),
        control_job("j3", "h3", "cmd-3", None, &mock),
    ];

    let started = tokio::time::Instant::now();
    let report = JobQueue::new("push", fast_limits(2)).run(jobs).await;

    assert!(report.succeeded());
    // j3 can only start once a slot frees up, so the stage takes at least
    // two job-durations end to end.
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test]
async fn zero_jobs_is_an_immediate_success() {
    let report = JobQueue::new("push", fast_limits(3)).run(Vec::new()).await;
    assert!(report.succeeded());
    assert!(report.results.is_empty());
}
