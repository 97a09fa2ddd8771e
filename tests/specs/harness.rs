// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared cluster fixture: one coordinator plus worker agents driven by
//! the fake container runtime.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cc_core::{JobId, JobShape, JobState, WorkerId};
use cc_coordinator::{Config, Coordinator};
use cc_wire::{InputUpload, JobDetail, Request, Response};
use cc_worker::runtime::{FakeBehavior, FakeRuntime};
use cc_worker::{Agent, AgentConfig, Client};
use md5::{Digest, Md5};
use tempfile::TempDir;

/// Lease TTL used across the scenarios: short enough that expiry tests
/// finish quickly, long enough for three heartbeats per window.
pub const LEASE: Duration = Duration::from_millis(900);

/// Polling deadline for state assertions.
const DEADLINE: Duration = Duration::from_secs(15);

pub struct Cluster {
    pub coordinator: Coordinator,
    pub client: Client,
    _storage: TempDir,
    scratch: TempDir,
}

impl Cluster {
    pub async fn start() -> Self {
        let storage = TempDir::new().expect("storage root");
        let mut config =
            Config::new("127.0.0.1:0".parse().expect("addr"), storage.path().to_path_buf());
        config.lease_ttl = LEASE;
        config.worker_ttl = LEASE * 4;
        config.sweep_interval = Duration::from_millis(150);

        let coordinator = Coordinator::start(config).await.expect("coordinator start");
        let client = Client::new(coordinator.addr.to_string());
        Self {
            coordinator,
            client,
            _storage: storage,
            scratch: TempDir::new().expect("scratch root"),
        }
    }

    /// Spawn an agent with the given runtime behavior.
    pub fn spawn_worker(&self, name: &str, behavior: FakeBehavior) -> WorkerHandle {
        let runtime = Arc::new(FakeRuntime::with_behavior(behavior));
        let config = AgentConfig {
            coordinator: self.coordinator.addr.to_string(),
            worker_id: WorkerId::new(name),
            poll_interval: Duration::from_millis(20),
            max_poll_interval: Duration::from_millis(200),
            lease_ttl: LEASE,
            work_dir: self.scratch.path().join(name),
            unreachable_threshold: 100,
        };
        let agent = Agent::new(config, Arc::clone(&runtime));
        let token = agent.shutdown_token();
        let handle = tokio::spawn(async move { agent.run().await });
        WorkerHandle { token, handle, runtime }
    }

    pub async fn submit(&self, request: Request) -> JobId {
        match self.client.request(&request).await.expect("submit request") {
            Response::JobSubmitted { job_id } => job_id,
            other => panic!("submit failed: {:?}", other),
        }
    }

    pub async fn submit_single(
        &self,
        plugin: &str,
        params: &[(&str, &str)],
        inputs: &[(&str, &[u8])],
    ) -> JobId {
        self.submit(Request::SubmitJob {
            shape: JobShape::Single,
            map_plugin: plugin.to_string(),
            reduce_plugin: None,
            shards: None,
            params: to_params(params),
            inputs: to_inputs(inputs),
        })
        .await
    }

    pub async fn submit_sort(&self, lines: &[&str], shards: u32) -> JobId {
        let mut input = lines.join("\n");
        input.push('\n');
        self.submit(Request::SubmitJob {
            shape: JobShape::MapReduce,
            map_plugin: "sort_map".to_string(),
            reduce_plugin: Some("sort_reduce".to_string()),
            shards: Some(shards),
            params: BTreeMap::new(),
            inputs: vec![InputUpload { name: "input.txt".to_string(), bytes: input.into_bytes() }],
        })
        .await
    }

    pub async fn get_job(&self, job_id: JobId) -> Option<JobDetail> {
        match self.client.request(&Request::GetJob { job_id }).await.expect("get job") {
            Response::Job { job } => job.map(|b| *b),
            other => panic!("get job failed: {:?}", other),
        }
    }

    pub async fn cancel(&self, job_id: JobId) {
        match self.client.request(&Request::CancelJob { job_id }).await.expect("cancel") {
            Response::Ok => {}
            other => panic!("cancel failed: {:?}", other),
        }
    }

    pub async fn download(&self, job_id: JobId, name: &str) -> Vec<u8> {
        self.client.download(&job_id, name).await.expect("download").0
    }

    /// Poll GetJob until the job reaches `state`.
    pub async fn wait_for_state(&self, job_id: JobId, state: JobState) -> JobDetail {
        let deadline = tokio::time::Instant::now() + DEADLINE;
        loop {
            let detail = self.get_job(job_id).await.expect("job exists");
            if detail.state == state {
                return detail;
            }
            assert!(
                !(detail.state.is_terminal() && detail.state != state),
                "job settled in {:?} while waiting for {:?}: {:?}",
                detail.state,
                state,
                detail
            );
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {:?}, last: {:?}",
                state,
                detail
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Poll GetJob until `predicate` holds.
    pub async fn wait_until(
        &self,
        job_id: JobId,
        what: &str,
        predicate: impl Fn(&JobDetail) -> bool,
    ) -> JobDetail {
        let deadline = tokio::time::Instant::now() + DEADLINE;
        loop {
            let detail = self.get_job(job_id).await.expect("job exists");
            if predicate(&detail) {
                return detail;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting until {}, last: {:?}",
                what,
                detail
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

pub struct WorkerHandle {
    token: tokio_util::sync::CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), cc_worker::AgentError>>,
    pub runtime: Arc<FakeRuntime>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        self.token.cancel();
        self.handle.abort();
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn to_params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn to_inputs(inputs: &[(&str, &[u8])]) -> Vec<InputUpload> {
    inputs
        .iter()
        .map(|(name, bytes)| InputUpload { name: name.to_string(), bytes: bytes.to_vec() })
        .collect()
}

pub fn md5_hex(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
