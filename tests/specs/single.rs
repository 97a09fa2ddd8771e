// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shape jobs end to end.

use cc_core::{JobState, TaskKind, TaskState};
use cc_worker::runtime::FakeBehavior;

use crate::harness::{md5_hex, Cluster};

#[tokio::test]
async fn single_hashcat_cracks_the_wordlist() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"hashcat");
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &target), ("hash_mode", "0")],
            &[("wordlist.txt", b"password123\nsecret\nhashcat\nadmin\n")],
        )
        .await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(detail.final_output_name.as_deref(), Some("result.txt"));
    assert_eq!(detail.tasks.len(), 1);
    assert_eq!(detail.tasks[0].kind, TaskKind::Single);
    assert_eq!(detail.tasks[0].state, TaskState::Succeeded);

    let result = cluster.download(job_id, "result.txt").await;
    assert_eq!(result, b"hashcat\n");
}

#[tokio::test]
async fn artifact_round_trips_through_the_store() {
    let cluster = Cluster::start().await;
    let content: &[u8] = b"alpha\nbravo\n";
    let job_id = cluster
        .submit_single(
            "hashcat",
            &[("target_hash", &md5_hex(b"alpha")), ("hash_mode", "0")],
            &[("wordlist.txt", content)],
        )
        .await;

    assert_eq!(cluster.download(job_id, "wordlist.txt").await, content);
}

#[tokio::test]
async fn two_workers_split_a_queue_of_jobs() {
    let cluster = Cluster::start().await;
    let target = md5_hex(b"secret");
    let mut jobs = Vec::new();
    for _ in 0..4 {
        jobs.push(
            cluster
                .submit_single(
                    "hashcat",
                    &[("target_hash", &target), ("hash_mode", "0")],
                    &[("wordlist.txt", b"secret\nother\n")],
                )
                .await,
        );
    }

    let _w1 = cluster.spawn_worker("w1", FakeBehavior::Run);
    let _w2 = cluster.spawn_worker("w2", FakeBehavior::Run);

    for job_id in jobs {
        let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
        assert_eq!(detail.tasks[0].retry_count, 0);
        assert_eq!(cluster.download(job_id, "result.txt").await, b"secret\n");
    }
}
