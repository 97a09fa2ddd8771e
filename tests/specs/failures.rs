// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure paths: unknown plugins, failing containers, retry exhaustion.

use cc_core::{JobState, TaskErrorKind, TaskState};
use cc_worker::runtime::FakeBehavior;

use crate::harness::{md5_hex, Cluster};

#[tokio::test]
async fn unknown_plugin_exhausts_retries_and_fails_the_job() {
    let cluster = Cluster::start().await;
    let job_id = cluster
        .submit_single("bogus", &[], &[("wordlist.txt", b"data\n")])
        .await;

    // Two workers so the same-worker cooldown never stalls the retries
    let _w1 = cluster.spawn_worker("w1", FakeBehavior::Run);
    let _w2 = cluster.spawn_worker("w2", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Failed).await;
    let task = &detail.tasks[0];
    assert_eq!(task.state, TaskState::Failed);
    assert_eq!(task.retry_count, cc_core::limits::MAX_RETRIES);
    assert_eq!(
        task.last_error.as_ref().map(|e| e.kind.clone()),
        Some(TaskErrorKind::PluginUnknown)
    );
    assert_eq!(
        detail.last_error.as_ref().map(|e| e.kind.clone()),
        Some(TaskErrorKind::PluginUnknown)
    );
}

#[tokio::test]
async fn failing_container_reports_its_exit_code() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"secret\n")],
        )
        .await;

    let _w1 = cluster.spawn_worker("w1", FakeBehavior::Exit(9));
    let _w2 = cluster.spawn_worker("w2", FakeBehavior::Exit(9));

    let detail = cluster.wait_for_state(job_id, JobState::Failed).await;
    assert_eq!(
        detail.tasks[0].last_error.as_ref().map(|e| e.kind.clone()),
        Some(TaskErrorKind::PluginExit { code: 9 })
    );
}

#[tokio::test]
async fn missing_output_is_terminal_after_one_retry() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"secret\n")],
        )
        .await;

    let _w1 = cluster.spawn_worker("w1", FakeBehavior::SkipOutputs);
    let _w2 = cluster.spawn_worker("w2", FakeBehavior::SkipOutputs);

    let detail = cluster.wait_for_state(job_id, JobState::Failed).await;
    let task = &detail.tasks[0];
    assert_eq!(task.retry_count, 1);
    assert_eq!(
        task.last_error.as_ref().map(|e| e.kind.clone()),
        Some(TaskErrorKind::OutputMissing)
    );
}

#[tokio::test]
async fn a_healthy_worker_rescues_a_job_from_a_broken_one() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"secret\n")],
        )
        .await;

    // The broken worker fails the first attempt...
    let broken = cluster.spawn_worker("broken", FakeBehavior::Exit(1));
    cluster.wait_until(job_id, "first attempt fails", |d| d.tasks[0].retry_count >= 1).await;
    broken.stop();

    // ...and a healthy one picks the task up on re-queue.
    let _healthy = cluster.spawn_worker("healthy", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(cluster.download(job_id, "result.txt").await, b"secret\n");
    assert!(detail.tasks[0].retry_count >= 1);
}
