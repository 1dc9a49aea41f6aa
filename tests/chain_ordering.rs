use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use rollout::command::{Command, ParamTable};
use rollout::remote::{MockTarget, Target};
use rollout::sched::{Job, JobQueue, JobStatus, QueueLimits};

fn build_job(
    id: &str,
    host: &str,
    command: &str,
    pairs: &[(&str, &str)],
    dep: Option<&str>,
    mock: &MockTarget,
) -> Job {
    let params: BTreeMap<String, toml::Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
        .collect();
    let cmd = Command::build(command, &ParamTable::new(command, params))
        .expect("valid command params");

    Job {
        id: id.to_string(),
        host_affinity: host.to_string(),
        depends_on: dep.map(str::to_string),
        command: cmd,
        target: Target::Mock(mock.clone()),
        tag: None,
    }
}

fn fast_limits(concurrency: usize) -> QueueLimits {
    QueueLimits::new(concurrency).tick(Duration::from_millis(5))
}

#[tokio::test]
async fn chain_runs_strictly_in_order() {
    let mock = MockTarget::new().with_delay(Duration::from_millis(20));
    let jobs = vec![
        build_job("first", "h1", "control_service", &[("control_command", "step-one")], None, &mock),
        build_job(
            "second",
            "h1",
            "control_service",
            &[("control_command", "step-two")],
            Some("first"),
            &mock,
        ),
    ];

    // Concurrency would allow both at once; the chain must serialize them.
    let report = JobQueue::new("push", fast_limits(4)).run(jobs).await;

    assert!(report.succeeded());
    let calls = mock.calls();
    let one = calls.iter().position(|c| c.contains("step-one")).unwrap();
    let two = calls.iter().position(|c| c.contains("step-two")).unwrap();
    assert!(one < two);
    assert_eq!(mock.max_in_flight(), 1);
}

/// The upload -> unpack -> symlink chain with a failing unpack: the upload
/// stays recorded as a success, the symlink is never attempted.
#[tokio::test]
async fn failure_mid_chain_cancels_the_remainder() {
    let mut artifact = tempfile::NamedTempFile::new().unwrap();
    artifact.write_all(b"not really a tarball").unwrap();
    let artifact_path = artifact.path().to_str().unwrap().to_string();

    let mock = MockTarget::new();
    mock.fail_matching("tar -xzf");

    let jobs = vec![
        build_job(
            "upload",
            "web01",
            "upload",
            &[("source", &artifact_path), ("destination", "/srv/incoming")],
            None,
            &mock,
        ),
        build_job(
            "unpack",
            "web01",
            "unpack",
            &[
                ("source", "/srv/incoming/app.tgz"),
                ("destination", "/srv/releases/1.4.2"),
            ],
            Some("upload"),
            &mock,
        ),
        build_job(
            "symlink",
            "web01",
            "symlink",
            &[
                ("source", "/srv/releases/1.4.2"),
                ("destination", "/srv/current"),
            ],
            Some("unpack"),
            &mock,
        ),
    ];

    let report = JobQueue::new("push", fast_limits(4)).run(jobs).await;

    assert!(!report.succeeded());
    assert_eq!(report.status_of("upload"), Some(JobStatus::Succeeded));
    assert_eq!(report.status_of("unpack"), Some(JobStatus::Failed));
    assert_eq!(report.status_of("symlink"), Some(JobStatus::NotRun));

    let calls = mock.calls();
    assert!(calls.iter().any(|c| c.starts_with("put ")));
    assert!(calls.iter().any(|c| c.contains("tar -xzf")));
    assert!(!calls.iter().any(|c| c.contains("ln -sfn")));
    assert!(!calls.iter().any(|c| c.contains("readlink")));
}

/// An independent sibling is unaffected by another entry's chain.
#[tokio::test]
async fn chains_and_singles_mix_within_a_stage() {
    let mock = MockTarget::new().with_delay(Duration::from_millis(10));
    let jobs = vec![
        build_job("a1", "h1", "control_service", &[("control_command", "chain-a1")], None, &mock),
        build_job(
            "a2",
            "h1",
            "control_service",
            &[("control_command", "chain-a2")],
            Some("a1"),
            &mock,
        ),
        build_job("solo", "h2", "control_service", &[("control_command", "solo-cmd")], None, &mock),
    ];

    let report = JobQueue::new("push", fast_limits(4)).run(jobs).await;

    assert!(report.succeeded());
    for id in ["a1", "a2", "solo"] {
        assert_eq!(report.status_of(id), Some(JobStatus::Succeeded));
    }
}
