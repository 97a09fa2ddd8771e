// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease expiry after a worker crash, and cancellation mid-execution.

use std::time::Duration;

use cc_core::{JobState, TaskErrorKind, TaskState};
use cc_wire::Request;
use cc_worker::runtime::FakeBehavior;

use crate::harness::{md5_hex, Cluster};

#[tokio::test]
async fn crashed_worker_loses_its_lease_and_another_finishes() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"secret\n")],
        )
        .await;

    // "Crash": claim by hand and never heartbeat
    let claimed = cluster.client.claim(&"doomed".into()).await.expect("claim");
    let task_id = claimed.expect("a task was pending").task_id;

    // After the lease lapses the sweeper re-queues the task
    let detail = cluster
        .wait_until(job_id, "lease expiry re-queues the task", |d| {
            d.tasks[0].state == TaskState::Pending && d.tasks[0].retry_count == 1
        })
        .await;
    assert_eq!(
        detail.tasks[0].last_error.as_ref().map(|e| e.kind.clone()),
        Some(TaskErrorKind::LeaseExpired)
    );

    // A heartbeat from the crashed worker now reports reassignment
    let response = cluster
        .client
        .heartbeat(&"doomed".into(), &task_id)
        .await
        .expect("heartbeat request");
    assert_eq!(response, cc_wire::BeatStatus::Reassigned);

    // A live worker completes the job
    let _worker = cluster.spawn_worker("rescuer", FakeBehavior::Run);
    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(detail.tasks[0].retry_count, 1);
    assert_eq!(cluster.download(job_id, "result.txt").await, b"secret\n");
}

#[tokio::test]
async fn cancellation_kills_the_container_and_uploads_nothing() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"secret\n")],
        )
        .await;

    // The container hangs, so the job stays in flight until cancelled
    let worker = cluster.spawn_worker("w1", FakeBehavior::Hang);
    cluster
        .wait_until(job_id, "task picked up", |d| {
            matches!(d.tasks[0].state, TaskState::Assigned | TaskState::Running)
        })
        .await;

    cluster.cancel(job_id).await;
    let detail = cluster.wait_for_state(job_id, JobState::Cancelled).await;
    assert_eq!(detail.state, JobState::Cancelled);

    // The worker's next heartbeat kills the container
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !worker.runtime.running().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "container was never killed");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // Nothing was uploaded
    let response = cluster
        .client
        .request(&Request::DownloadArtifact { job_id, name: "result.txt".to_string() })
        .await;
    assert!(
        matches!(
            response,
            Err(cc_worker::ClientError::Coordinator { kind: cc_wire::ErrorKind::NotFound, .. })
        ),
        "result.txt should not exist: {:?}",
        response
    );
}

#[tokio::test]
async fn cancelled_jobs_stop_dispatching_pending_tasks() {
    let cluster = Cluster::start().await;
    let job_id = cluster.submit_sort(&["b", "a"], 2).await;

    cluster.cancel(job_id).await;

    let claimed = cluster.client.claim(&"w1".into()).await.expect("claim request");
    assert!(claimed.is_none());

    let detail = cluster.get_job(job_id).await.expect("job exists");
    assert_eq!(detail.state, JobState::Cancelled);
}
