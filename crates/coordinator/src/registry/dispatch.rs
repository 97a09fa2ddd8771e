// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch protocol: claim, heartbeat, report.

use std::collections::BTreeMap;

use cc_core::{
    output_names, Clock, JobState, Lease, Task, TaskError, TaskErrorKind, TaskId, TaskKind,
    TaskState, WorkerId,
};

use super::{Registry, RegistryError};

/// A claim handed to a worker: the task plus its job's parameter bag.
#[derive(Debug, Clone)]
pub struct ClaimedWork {
    pub task: Task,
    pub params: BTreeMap<String, String>,
}

impl<C: Clock> Registry<C> {
    /// Hand the oldest dispatchable task to `worker`, or `None`.
    ///
    /// Selection is FIFO over `pending_since_ms` with `task_id` as the
    /// tie-break. Tasks of cancelled or failed jobs never dispatch, and a
    /// worker sits out the cooldown window on a task it just failed.
    pub fn claim(&mut self, worker: &WorkerId) -> Option<ClaimedWork> {
        self.touch_worker(worker);
        let now_ms = self.clock.epoch_ms();

        let chosen = self
            .tasks
            .values()
            .filter(|t| t.claimable_by(worker, now_ms))
            .filter(|t| {
                self.jobs
                    .get(&t.job)
                    .is_some_and(|j| matches!(j.state, JobState::Pending | JobState::Running))
            })
            .min_by(|a, b| {
                (a.pending_since_ms, a.id.as_str()).cmp(&(b.pending_since_ms, b.id.as_str()))
            })
            .map(|t| t.id)?;

        let lease_ms = self.config.lease_ttl.as_millis() as u64;
        let task = self.tasks.get_mut(&chosen)?;
        task.state = TaskState::Assigned;
        task.lease = Some(Lease {
            worker: worker.clone(),
            issued_at_ms: now_ms,
            expires_at_ms: now_ms + lease_ms,
        });

        let job_id = task.job;
        let snapshot = task.clone();

        let params = match self.jobs.get_mut(&job_id) {
            Some(job) => {
                if job.state == JobState::Pending {
                    job.state = JobState::Running;
                }
                job.spec.params.clone()
            }
            None => BTreeMap::new(),
        };

        if let Some(record) = self.workers.get_mut(worker) {
            record.held = Some(chosen);
        }

        tracing::info!(task_id = %chosen, worker = %worker, job_id = %job_id, "task claimed");
        Some(ClaimedWork { task: snapshot, params })
    }

    /// Extend the lease on a held task. Returns `false` when the worker
    /// must abandon the task (no longer the holder, or the job was
    /// cancelled); in that case no task state changes.
    pub fn heartbeat(&mut self, worker: &WorkerId, task_id: &TaskId) -> bool {
        self.touch_worker(worker);
        let now_ms = self.clock.epoch_ms();
        let lease_ms = self.config.lease_ttl.as_millis() as u64;

        let cancelled = {
            let Some(task) = self.tasks.get(task_id) else { return false };
            if task.holder() != Some(worker) {
                return false;
            }
            self.jobs.get(&task.job).is_none_or(|j| j.state == JobState::Cancelled)
        };

        if cancelled {
            // Release the task so the tables stay consistent; the job is
            // cancelled, so it will never dispatch again.
            if let Some(task) = self.tasks.get_mut(task_id) {
                task.lease = None;
                task.state = TaskState::Pending;
                task.pending_since_ms = now_ms;
                task.last_error = Some(TaskError::new(
                    TaskErrorKind::JobCancelled,
                    "job cancelled while in flight",
                ));
            }
            if let Some(record) = self.workers.get_mut(worker) {
                if record.held.as_ref() == Some(task_id) {
                    record.held = None;
                }
            }
            return false;
        }

        if let Some(task) = self.tasks.get_mut(task_id) {
            if task.state == TaskState::Assigned {
                // First progress report
                task.state = TaskState::Running;
            }
            if let Some(lease) = task.lease.as_mut() {
                lease.expires_at_ms = now_ms + lease_ms;
            }
        }
        true
    }

    /// Commit a successful outcome. The caller has already verified that
    /// every reported output artifact exists in the store.
    pub fn report_success(
        &mut self,
        worker: &WorkerId,
        task_id: &TaskId,
        outputs: &[String],
    ) -> Result<(), RegistryError> {
        self.touch_worker(worker);

        let job_id = {
            let task = self.tasks.get(task_id).ok_or(RegistryError::UnknownTask)?;
            if task.holder() != Some(worker) {
                return Err(RegistryError::NotHolder);
            }

            let mut declared: Vec<&str> = task.expected_outputs.iter().map(String::as_str).collect();
            let mut reported: Vec<&str> = outputs.iter().map(String::as_str).collect();
            declared.sort_unstable();
            reported.sort_unstable();
            if declared != reported {
                return Err(RegistryError::OutputMismatch);
            }
            task.job
        };

        if self.jobs.get(&job_id).is_some_and(|j| j.state == JobState::Cancelled) {
            return Err(RegistryError::JobCancelled);
        }

        if let Some(task) = self.tasks.get_mut(task_id) {
            task.state = TaskState::Succeeded;
            task.lease = None;
        }
        if let Some(record) = self.workers.get_mut(worker) {
            if record.held.as_ref() == Some(task_id) {
                record.held = None;
            }
        }
        tracing::info!(task_id = %task_id, worker = %worker, "task succeeded");

        self.on_task_succeeded(&job_id, task_id);
        Ok(())
    }

    /// Commit a failed outcome; the registry decides retry vs terminal.
    pub fn report_failure(
        &mut self,
        worker: &WorkerId,
        task_id: &TaskId,
        error: TaskError,
    ) -> Result<(), RegistryError> {
        self.touch_worker(worker);

        {
            let task = self.tasks.get(task_id).ok_or(RegistryError::UnknownTask)?;
            if task.holder() != Some(worker) {
                return Err(RegistryError::NotHolder);
            }
        }
        if let Some(record) = self.workers.get_mut(worker) {
            if record.held.as_ref() == Some(task_id) {
                record.held = None;
            }
        }

        self.fail_or_requeue(task_id, error, Some(worker.clone()));
        Ok(())
    }

    /// Cascade after a success: reduce-task creation when the map stage
    /// completes, job success when the terminal task finishes.
    fn on_task_succeeded(&mut self, job_id: &cc_core::JobId, task_id: &TaskId) {
        let now_ms = self.clock.epoch_ms();

        let Some(job) = self.jobs.get(job_id) else { return };

        // Map stage completion → create the reduce task, inputs ordered
        // by shard index.
        let finished_kind = self.tasks.get(task_id).map(|t| t.kind);
        if finished_kind == Some(TaskKind::Map) {
            let mut maps: Vec<&Task> = job
                .tasks
                .iter()
                .filter_map(|t| self.tasks.get(t))
                .filter(|t| t.kind == TaskKind::Map)
                .collect();
            if maps.iter().all(|t| t.state == TaskState::Succeeded) {
                maps.sort_by_key(|t| t.shard_index);
                let inputs: Vec<String> =
                    maps.iter().flat_map(|t| t.expected_outputs.iter().cloned()).collect();

                let reduce_plugin =
                    job.spec.reduce_plugin.clone().unwrap_or_else(|| job.spec.map_plugin.clone());
                let reduce = Task::new(
                    TaskId::new(),
                    *job_id,
                    TaskKind::Reduce,
                    None,
                    reduce_plugin.clone(),
                    inputs,
                    output_names(&reduce_plugin, TaskKind::Reduce, None),
                    now_ms,
                );
                let reduce_id = reduce.id;
                self.tasks.insert(reduce_id, reduce);
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.tasks.push(reduce_id);
                    job.terminal_task = Some(reduce_id);
                }
                tracing::info!(job_id = %job_id, task_id = %reduce_id, "map stage complete, reduce task created");
                return;
            }
            return;
        }

        // Terminal task success → job success.
        if job.terminal_task.as_ref() == Some(task_id) {
            let final_output =
                self.tasks.get(task_id).and_then(|t| t.expected_outputs.first().cloned());
            if let Some(job) = self.jobs.get_mut(job_id) {
                job.state = JobState::Succeeded;
                job.final_output = final_output;
                tracing::info!(job_id = %job_id, output = ?job.final_output, "job succeeded");
            }
        }
    }

}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
