// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative in-memory job/task/worker state.
//!
//! Jobs, tasks, and workers live in flat tables keyed by id; entities
//! reference each other by id only. Every mutation happens inside one
//! short critical section held by the caller (the listener wraps the
//! registry in `Arc<Mutex<_>>`); nothing here touches the filesystem or
//! the network.

mod dispatch;
pub mod sweep;
#[cfg(test)]
pub(crate) mod test_support;

pub use dispatch::ClaimedWork;
pub use sweep::SweepStats;

use std::collections::HashMap;
use std::time::Duration;

use cc_core::{
    limits, output_names, shard_name, Clock, Job, JobId, JobSpec, JobState, Task, TaskError,
    TaskId, TaskKind, TaskState, WorkerId,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown job")]
    UnknownJob,

    #[error("unknown task")]
    UnknownTask,

    #[error("task is not held by this worker")]
    NotHolder,

    #[error("job is cancelled")]
    JobCancelled,

    #[error("job already finished")]
    JobFinished,

    #[error("reported outputs do not match the declared set")]
    OutputMismatch,
}

/// A worker as the coordinator sees it: implicit registration, forgotten
/// after `worker_ttl` of silence.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub last_beat_ms: u64,
    pub held: Option<TaskId>,
}

/// Lease and retry tuning.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub lease_ttl: Duration,
    pub worker_ttl: Duration,
    /// Same-worker redispatch block after a failed attempt.
    pub cooldown: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lease_ttl: limits::DEFAULT_LEASE_TTL,
            worker_ttl: limits::DEFAULT_WORKER_TTL,
            cooldown: limits::redispatch_cooldown(limits::DEFAULT_LEASE_TTL),
        }
    }
}

pub struct Registry<C: Clock> {
    clock: C,
    config: RegistryConfig,
    jobs: HashMap<JobId, Job>,
    tasks: HashMap<TaskId, Task>,
    workers: HashMap<WorkerId, WorkerRecord>,
}

impl<C: Clock> Registry<C> {
    pub fn new(clock: C, config: RegistryConfig) -> Self {
        Self { clock, config, jobs: HashMap::new(), tasks: HashMap::new(), workers: HashMap::new() }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a validated job and create its initial tasks.
    ///
    /// The caller has already written the input artifacts (and, for
    /// map_reduce, the `shard-<i>` artifacts) to the store. `inputs` is
    /// the uploaded artifact names in creation order; for map_reduce the
    /// first one is the sharded input and any others are attached to
    /// every map task verbatim.
    pub fn register_job(&mut self, id: JobId, spec: JobSpec, inputs: &[String]) {
        let now_ms = self.clock.epoch_ms();
        let mut job = Job::new(id, spec, now_ms);

        match job.spec.shape {
            cc_core::JobShape::Single => {
                let task = Task::new(
                    TaskId::new(),
                    id,
                    TaskKind::Single,
                    None,
                    job.spec.map_plugin.clone(),
                    inputs.to_vec(),
                    output_names(&job.spec.map_plugin, TaskKind::Single, None),
                    now_ms,
                );
                job.tasks.push(task.id);
                job.terminal_task = Some(task.id);
                self.tasks.insert(task.id, task);
            }
            cc_core::JobShape::MapReduce => {
                let extra: Vec<String> = inputs.iter().skip(1).cloned().collect();
                for index in 0..job.spec.shards {
                    let mut task_inputs = vec![shard_name(index)];
                    task_inputs.extend(extra.iter().cloned());
                    let task = Task::new(
                        TaskId::new(),
                        id,
                        TaskKind::Map,
                        Some(index),
                        job.spec.map_plugin.clone(),
                        task_inputs,
                        output_names(&job.spec.map_plugin, TaskKind::Map, Some(index)),
                        now_ms,
                    );
                    job.tasks.push(task.id);
                    self.tasks.insert(task.id, task);
                }
                // The reduce task is created when the map stage completes.
            }
        }

        self.jobs.insert(id, job);
    }

    /// Mark a job cancelled. Pending tasks stop dispatching; holders
    /// learn on their next heartbeat.
    pub fn cancel(&mut self, id: &JobId) -> Result<(), RegistryError> {
        let job = self.jobs.get_mut(id).ok_or(RegistryError::UnknownJob)?;
        match job.state {
            JobState::Cancelled => Ok(()),
            state if state.is_terminal() => Err(RegistryError::JobFinished),
            _ => {
                job.state = JobState::Cancelled;
                tracing::info!(job_id = %id, "job cancelled");
                Ok(())
            }
        }
    }

    /// Consistent snapshot of a job and its tasks, for GetJob.
    pub fn job_snapshot(&self, id: &JobId) -> Option<(Job, Vec<Task>)> {
        let job = self.jobs.get(id)?;
        let tasks = job.tasks.iter().filter_map(|t| self.tasks.get(t)).cloned().collect();
        Some((job.clone(), tasks))
    }

    /// Parent job of a task.
    pub fn task_job(&self, task_id: &TaskId) -> Option<JobId> {
        self.tasks.get(task_id).map(|t| t.job)
    }

    /// Expected-output check for artifact uploads: is `name` an expected
    /// output of some unfinished task in this job?
    pub fn is_expected_output(&self, id: &JobId, name: &str) -> Result<bool, RegistryError> {
        let job = self.jobs.get(id).ok_or(RegistryError::UnknownJob)?;
        Ok(job
            .tasks
            .iter()
            .filter_map(|t| self.tasks.get(t))
            .filter(|t| t.state != TaskState::Succeeded)
            .any(|t| t.expected_outputs.iter().any(|o| o == name)))
    }

    fn touch_worker(&mut self, worker: &WorkerId) {
        let now_ms = self.clock.epoch_ms();
        self.workers
            .entry(worker.clone())
            .and_modify(|w| w.last_beat_ms = now_ms)
            .or_insert(WorkerRecord { last_beat_ms: now_ms, held: None });
    }

    fn release_holder(&mut self, task_id: &TaskId) {
        let holder = self.tasks.get(task_id).and_then(|t| t.holder().cloned());
        if let Some(worker) = holder {
            if let Some(record) = self.workers.get_mut(&worker) {
                if record.held.as_ref() == Some(task_id) {
                    record.held = None;
                }
            }
        }
    }

    /// Record a task failure against its job, then fail or re-queue the
    /// task depending on the error kind's retry cap.
    fn fail_or_requeue(&mut self, task_id: &TaskId, error: TaskError, failed_by: Option<WorkerId>) {
        let now_ms = self.clock.epoch_ms();
        let cooldown_ms = self.config.cooldown.as_millis() as u64;

        let (job_id, terminal, retries) = {
            let Some(task) = self.tasks.get_mut(task_id) else { return };
            let job_id = task.job;
            if task.retry_count >= error.kind.retry_cap() {
                task.fail(error.clone());
                (job_id, true, task.retry_count)
            } else {
                let cooldown = failed_by.map(|worker| cc_core::task::Cooldown {
                    worker,
                    until_ms: now_ms + cooldown_ms,
                });
                task.requeue(error.clone(), now_ms, cooldown);
                (job_id, false, task.retry_count)
            }
        };

        if terminal {
            tracing::warn!(task_id = %task_id, error = %error, retries, "task failed terminally");
        } else {
            tracing::info!(task_id = %task_id, error = %error, retry = retries, "task re-queued");
        }

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.last_error = Some(error);
            if terminal && !job.state.is_terminal() {
                job.state = JobState::Failed;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    #[cfg(test)]
    pub(crate) fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    #[cfg(test)]
    pub(crate) fn worker(&self, id: &WorkerId) -> Option<&WorkerRecord> {
        self.workers.get(id)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
