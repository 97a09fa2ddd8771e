// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for registry tests.

use std::collections::BTreeMap;
use std::time::Duration;

use cc_core::{FakeClock, JobId, JobShape, JobSpec, TaskId, WorkerId};

use super::{Registry, RegistryConfig};

pub const LEASE: Duration = Duration::from_millis(1000);

pub fn registry() -> (Registry<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let config = RegistryConfig {
        lease_ttl: LEASE,
        worker_ttl: Duration::from_millis(4000),
        cooldown: Duration::from_millis(500),
    };
    (Registry::new(clock.clone(), config), clock)
}

pub fn single_spec(plugin: &str) -> JobSpec {
    JobSpec {
        shape: JobShape::Single,
        map_plugin: plugin.to_string(),
        reduce_plugin: None,
        shards: 1,
        params: BTreeMap::new(),
    }
}

pub fn map_reduce_spec(shards: u32) -> JobSpec {
    JobSpec {
        shape: JobShape::MapReduce,
        map_plugin: "sort_map".to_string(),
        reduce_plugin: Some("sort_reduce".to_string()),
        shards,
        params: BTreeMap::new(),
    }
}

pub fn submit_single(registry: &mut Registry<FakeClock>, plugin: &str) -> JobId {
    let id = JobId::new();
    registry.register_job(id, single_spec(plugin), &["wordlist.txt".to_string()]);
    id
}

pub fn submit_map_reduce(registry: &mut Registry<FakeClock>, shards: u32) -> JobId {
    let id = JobId::new();
    registry.register_job(id, map_reduce_spec(shards), &["input.txt".to_string()]);
    id
}

pub fn worker(name: &str) -> WorkerId {
    WorkerId::new(name)
}

/// Claim, then report success with the task's declared outputs.
pub fn run_to_success(
    registry: &mut Registry<FakeClock>,
    worker: &WorkerId,
) -> Option<TaskId> {
    let work = registry.claim(worker)?;
    let outputs = work.task.expected_outputs.clone();
    registry.report_success(worker, &work.task.id, &outputs).ok()?;
    Some(work.task.id)
}
