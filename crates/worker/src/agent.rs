// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker agent loop: claim, stage, run, upload, report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cc_core::{TaskError, TaskErrorKind, WorkerId};
use cc_wire::{BeatStatus, ClaimedTask};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::plugins::{render_argv, staged_input_names, PluginRegistry};
use crate::runtime::{ContainerExit, ContainerRuntime, ContainerSpec};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("coordinator unreachable after {0} consecutive attempts")]
    Unreachable(u32),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Coordinator address, `host:port`.
    pub coordinator: String,
    pub worker_id: WorkerId,
    /// Base poll interval; backoff doubles from here with jitter.
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    /// Must match the coordinator's lease TTL; heartbeats run at a third
    /// of it.
    pub lease_ttl: Duration,
    /// Parent directory for per-task scratch directories.
    pub work_dir: PathBuf,
    /// Consecutive connect failures tolerated before giving up.
    pub unreachable_threshold: u32,
}

/// How a task attempt ended, agent-side.
enum Attempt {
    Completed(Vec<String>),
    Failed(TaskError),
    /// Reassigned mid-flight: no report, no upload.
    Abandoned,
}

/// Long-running agent processing one task at a time.
pub struct Agent<R: ContainerRuntime> {
    config: AgentConfig,
    client: Client,
    runtime: R,
    plugins: PluginRegistry,
    shutdown: CancellationToken,
}

impl<R: ContainerRuntime> Agent<R> {
    pub fn new(config: AgentConfig, runtime: R) -> Self {
        let client = Client::new(config.coordinator.clone());
        Self {
            config,
            client,
            runtime,
            plugins: PluginRegistry::builtin(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that ends the poll loop at the next claim boundary.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Poll for work until shut down or the coordinator stays
    /// unreachable past the configured threshold.
    pub async fn run(&self) -> Result<(), AgentError> {
        let mut backoff = self.config.poll_interval;
        let mut connect_failures: u32 = 0;

        info!(worker = %self.config.worker_id, coordinator = %self.config.coordinator, "agent started");
        loop {
            if self.shutdown.is_cancelled() {
                info!("agent shutting down");
                return Ok(());
            }

            match self.client.claim(&self.config.worker_id).await {
                Ok(Some(task)) => {
                    connect_failures = 0;
                    backoff = self.config.poll_interval;
                    self.execute(task).await;
                }
                Ok(None) => {
                    connect_failures = 0;
                    self.idle_sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_poll_interval);
                }
                Err(e) if e.is_unreachable() => {
                    connect_failures += 1;
                    warn!(attempt = connect_failures, "coordinator unreachable: {}", e);
                    if connect_failures >= self.config.unreachable_threshold {
                        return Err(AgentError::Unreachable(connect_failures));
                    }
                    self.idle_sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_poll_interval);
                }
                Err(e) => {
                    warn!("claim failed: {}", e);
                    self.idle_sleep(backoff).await;
                }
            }
        }
    }

    /// Sleep for a jittered interval in `[delay, 2*delay]`, cut short by
    /// shutdown.
    async fn idle_sleep(&self, delay: Duration) {
        let jittered = delay + rand::thread_rng().gen_range(Duration::ZERO..=delay);
        tokio::select! {
            _ = tokio::time::sleep(jittered) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }

    /// Run one claimed task to an outcome and report it.
    async fn execute(&self, task: ClaimedTask) {
        info!(task_id = %task.task_id, plugin = %task.plugin_kind, "task claimed");
        let scratch = self.config.work_dir.join(task.task_id.as_str());

        let attempt = self.attempt(&task, &scratch).await;
        match attempt {
            Attempt::Completed(outputs) => {
                match self
                    .client
                    .report_success(&self.config.worker_id, &task.task_id, outputs)
                    .await
                {
                    Ok(()) => info!(task_id = %task.task_id, "task completed"),
                    Err(e) => warn!(task_id = %task.task_id, "success report failed: {}", e),
                }
                let _ = std::fs::remove_dir_all(&scratch);
            }
            Attempt::Failed(error) => {
                warn!(task_id = %task.task_id, error = %error, "task failed");
                if let Err(e) = self
                    .client
                    .report_failure(&self.config.worker_id, &task.task_id, error)
                    .await
                {
                    warn!(task_id = %task.task_id, "failure report failed: {}", e);
                }
                let _ = std::fs::remove_dir_all(&scratch);
            }
            Attempt::Abandoned => {
                // Reassigned: the coordinator has moved on. Leave the
                // scratch directory behind and upload nothing.
                info!(task_id = %task.task_id, "task abandoned after reassignment");
            }
        }
    }

    async fn attempt(&self, task: &ClaimedTask, scratch: &Path) -> Attempt {
        // 1. Resolve the plugin descriptor
        let Some(descriptor) = self.plugins.get(&task.plugin_kind) else {
            return Attempt::Failed(TaskError::new(
                TaskErrorKind::PluginUnknown,
                format!("no descriptor for plugin kind {:?}", task.plugin_kind),
            ));
        };

        let staged = match staged_input_names(descriptor, &task.inputs) {
            Ok(staged) => staged,
            Err(e) => {
                return Attempt::Failed(TaskError::new(TaskErrorKind::PluginUnknown, e.to_string()))
            }
        };
        let argv = match render_argv(descriptor, &staged, &task.params) {
            Ok(argv) => argv,
            Err(e) => {
                return Attempt::Failed(TaskError::new(TaskErrorKind::PluginUnknown, e.to_string()))
            }
        };

        // 2. Stage inputs into a fresh scratch directory
        if let Err(e) = std::fs::create_dir_all(scratch) {
            return Attempt::Failed(TaskError::new(
                TaskErrorKind::InputUnavailable,
                format!("cannot create scratch dir: {}", e),
            ));
        }
        for (artifact, file_name) in task.inputs.iter().zip(&staged) {
            match self.client.download(&task.job_id, artifact).await {
                Ok((bytes, hash)) => {
                    if sha256_hex(&bytes) != hash {
                        return Attempt::Failed(TaskError::new(
                            TaskErrorKind::InputUnavailable,
                            format!("hash mismatch downloading {:?}", artifact),
                        ));
                    }
                    if let Err(e) = std::fs::write(scratch.join(file_name), &bytes) {
                        return Attempt::Failed(TaskError::new(
                            TaskErrorKind::InputUnavailable,
                            format!("cannot stage {:?}: {}", artifact, e),
                        ));
                    }
                }
                Err(e) => {
                    return Attempt::Failed(TaskError::new(
                        TaskErrorKind::InputUnavailable,
                        format!("cannot download {:?}: {}", artifact, e),
                    ));
                }
            }
        }

        // 3. Spawn the sibling container and babysit it
        let spec = ContainerSpec {
            name: format!("cc-{}", task.task_id.as_str()),
            image: descriptor.image.clone(),
            argv,
            scratch_dir: scratch.to_path_buf(),
        };
        if let Err(e) = self.runtime.spawn(&spec).await {
            return Attempt::Failed(TaskError::new(
                TaskErrorKind::PluginExit { code: -1 },
                e.to_string(),
            ));
        }

        let exit = match self.babysit(task, &spec.name).await {
            Some(exit) => exit,
            None => return Attempt::Abandoned,
        };

        if exit.code != 0 {
            return Attempt::Failed(TaskError::new(
                TaskErrorKind::PluginExit { code: exit.code },
                exit.stderr_tail,
            ));
        }

        // 4. Collect and upload outputs under the task's artifact names
        for (file_name, artifact) in descriptor.expected_outputs.iter().zip(&task.expected_outputs)
        {
            let path = scratch.join(file_name);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(_) => {
                    return Attempt::Failed(TaskError::new(
                        TaskErrorKind::OutputMissing,
                        format!("plugin exited 0 but did not write {:?}", file_name),
                    ));
                }
            };
            if let Err(e) = self.client.upload(&task.job_id, artifact, bytes).await {
                return Attempt::Failed(TaskError::new(
                    TaskErrorKind::InputUnavailable,
                    format!("cannot upload {:?}: {}", artifact, e),
                ));
            }
        }

        Attempt::Completed(task.expected_outputs.clone())
    }

    /// Wait for the container while heartbeating at a third of the lease
    /// TTL. Returns `None` when the coordinator reassigned the task (the
    /// container is killed first).
    async fn babysit(&self, task: &ClaimedTask, container: &str) -> Option<ContainerExit> {
        let mut beat = tokio::time::interval(self.config.lease_ttl / 3);
        beat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        beat.tick().await; // first tick completes immediately

        let wait = self.runtime.wait(container);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                exit = &mut wait => {
                    return match exit {
                        Ok(exit) => Some(exit),
                        Err(e) => Some(ContainerExit {
                            code: -1,
                            stderr_tail: format!("container wait failed: {}", e),
                        }),
                    };
                }
                _ = beat.tick() => {
                    match self.client.heartbeat(&self.config.worker_id, &task.task_id).await {
                        Ok(BeatStatus::Ok) => debug!(task_id = %task.task_id, "heartbeat ok"),
                        Ok(BeatStatus::Reassigned) => {
                            warn!(task_id = %task.task_id, "reassigned, killing container");
                            let _ = self.runtime.kill(container).await;
                            return None;
                        }
                        // Transient network trouble: keep working, the
                        // lease may still be extended on the next beat.
                        Err(e) => warn!(task_id = %task.task_id, "heartbeat failed: {}", e),
                    }
                }
            }
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
