// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Map→Reduce jobs end to end: sharding, fan-out, merge.

use cc_core::{JobState, TaskKind, TaskState};
use cc_worker::runtime::FakeBehavior;

use crate::harness::Cluster;

#[tokio::test]
async fn distributed_sort_across_four_shards() {
    let cluster = Cluster::start().await;
    let job_id =
        cluster.submit_sort(&["delta", "alpha", "charlie", "bravo", "echo"], 4).await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(detail.final_output_name.as_deref(), Some("final.txt"));

    let maps: Vec<_> = detail.tasks.iter().filter(|t| t.kind == TaskKind::Map).collect();
    assert_eq!(maps.len(), 4);
    assert!(maps.iter().all(|t| t.state == TaskState::Succeeded));
    assert_eq!(detail.tasks.iter().filter(|t| t.kind == TaskKind::Reduce).count(), 1);

    let merged = cluster.download(job_id, "final.txt").await;
    assert_eq!(merged, b"alpha\nbravo\ncharlie\ndelta\necho\n");
}

#[tokio::test]
async fn one_shard_map_reduce_still_runs_both_stages() {
    let cluster = Cluster::start().await;
    let job_id = cluster.submit_sort(&["bravo", "alpha"], 1).await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(detail.tasks.len(), 2);
    assert_eq!(detail.tasks.iter().filter(|t| t.kind == TaskKind::Map).count(), 1);
    assert_eq!(detail.tasks.iter().filter(|t| t.kind == TaskKind::Reduce).count(), 1);

    assert_eq!(cluster.download(job_id, "final.txt").await, b"alpha\nbravo\n");
}

#[tokio::test]
async fn surplus_shards_run_empty_and_still_reduce() {
    let cluster = Cluster::start().await;
    // One line, four shards: three map tasks see empty inputs
    let job_id = cluster.submit_sort(&["solo"], 4).await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);

    let detail = cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(detail.tasks.iter().filter(|t| t.kind == TaskKind::Map).count(), 4);

    assert_eq!(cluster.download(job_id, "final.txt").await, b"solo\n");
}

#[tokio::test]
async fn duplicate_lines_survive_the_merge() {
    let cluster = Cluster::start().await;
    let job_id =
        cluster.submit_sort(&["bravo", "alpha", "bravo", "alpha", "bravo"], 3).await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);

    cluster.wait_for_state(job_id, JobState::Succeeded).await;
    assert_eq!(
        cluster.download(job_id, "final.txt").await,
        b"alpha\nalpha\nbravo\nbravo\nbravo\n"
    );
}

#[tokio::test]
async fn map_outputs_are_distinct_artifacts() {
    let cluster = Cluster::start().await;
    let job_id = cluster.submit_sort(&["d", "c", "b", "a"], 2).await;

    let _worker = cluster.spawn_worker("w1", FakeBehavior::Run);
    cluster.wait_for_state(job_id, JobState::Succeeded).await;

    // Each map shard produced its own sorted artifact
    let first = cluster.download(job_id, "map-0000-sorted.txt").await;
    let second = cluster.download(job_id, "map-0001-sorted.txt").await;
    assert!(!first.is_empty());
    assert!(!second.is_empty());

    let mut lines: Vec<u8> = Vec::new();
    lines.extend_from_slice(&first);
    lines.extend_from_slice(&second);
    let mut all: Vec<&[u8]> = lines.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
    all.sort();
    assert_eq!(all, vec![b"a".as_slice(), b"b".as_slice(), b"c".as_slice(), b"d".as_slice()]);
}
