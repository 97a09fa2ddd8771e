// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity, state machine, and failure records.

use crate::job::JobId;
use crate::limits::MAX_RETRIES;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task, unique across all jobs.
    pub struct TaskId("tsk-");
}

/// What kind of work the task performs within its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Single,
    Map,
    Reduce,
}

crate::simple_display! {
    TaskKind {
        Single => "single",
        Map => "map",
        Reduce => "reduce",
    }
}

/// Task state machine.
///
/// ```text
/// Pending → Assigned → Running → Succeeded
///              └──────────┴────→ Failed ──retry──→ Pending
/// ```
///
/// Transitions are monotonic; the only re-entered state is `Pending`,
/// via explicit retry after a failure or lease expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Assigned,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

crate::simple_display! {
    TaskState {
        Pending => "pending",
        Assigned => "assigned",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

/// A worker's time-bounded claim on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub worker: WorkerId,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
}

/// Why a task attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// The claiming worker has no descriptor for the task's plugin kind.
    /// Another worker may still succeed, so this counts as a retry.
    PluginUnknown,
    /// The worker could not download a declared input artifact.
    InputUnavailable,
    /// The plugin container exited non-zero.
    PluginExit { code: i32 },
    /// The container exited zero but a declared output is missing.
    OutputMissing,
    /// The lease lapsed without heartbeats; registry-internal.
    LeaseExpired,
    /// The job was cancelled while the task was in flight.
    JobCancelled,
}

impl TaskErrorKind {
    /// How many re-queues this failure kind earns before it is terminal.
    ///
    /// `OutputMissing` is a plugin bug, not an environment hiccup: one
    /// retry, then terminal.
    pub fn retry_cap(&self) -> u32 {
        match self {
            TaskErrorKind::OutputMissing => 1,
            _ => MAX_RETRIES,
        }
    }
}

crate::simple_display! {
    TaskErrorKind {
        PluginUnknown => "plugin_unknown",
        InputUnavailable => "input_unavailable",
        PluginExit{..} => "plugin_exit",
        OutputMissing => "output_missing",
        LeaseExpired => "lease_expired",
        JobCancelled => "job_cancelled",
    }
}

/// A failure record: the kind plus human-readable detail (stderr tail,
/// missing artifact name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub detail: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

/// Same-worker redispatch block after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub worker: WorkerId,
    pub until_ms: u64,
}

/// A unit of work within a job, assignable to one worker at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub job: JobId,
    pub kind: TaskKind,
    /// 0..N−1 for map tasks, absent otherwise.
    pub shard_index: Option<u32>,
    pub plugin_kind: String,
    /// Input artifact names, resolved within the parent job.
    pub inputs: Vec<String>,
    /// Artifact names the worker must upload before reporting success.
    pub expected_outputs: Vec<String>,
    pub state: TaskState,
    pub lease: Option<Lease>,
    pub retry_count: u32,
    /// When the task last entered `Pending`; dispatch order key.
    pub pending_since_ms: u64,
    /// Block redispatch to the worker that just failed this task.
    pub cooldown: Option<Cooldown>,
    pub last_error: Option<TaskError>,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        job: JobId,
        kind: TaskKind,
        shard_index: Option<u32>,
        plugin_kind: impl Into<String>,
        inputs: Vec<String>,
        expected_outputs: Vec<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            job,
            kind,
            shard_index,
            plugin_kind: plugin_kind.into(),
            inputs,
            expected_outputs,
            state: TaskState::Pending,
            lease: None,
            retry_count: 0,
            pending_since_ms: now_ms,
            cooldown: None,
            last_error: None,
        }
    }

    /// The worker currently holding this task, if any.
    pub fn holder(&self) -> Option<&WorkerId> {
        match self.state {
            TaskState::Assigned | TaskState::Running => self.lease.as_ref().map(|l| &l.worker),
            _ => None,
        }
    }

    /// Whether `worker` may claim this task right now.
    pub fn claimable_by(&self, worker: &WorkerId, now_ms: u64) -> bool {
        if self.state != TaskState::Pending {
            return false;
        }
        match &self.cooldown {
            Some(cd) => cd.worker != *worker || cd.until_ms <= now_ms,
            None => true,
        }
    }

    /// Re-queue after a failure or lease expiry: increments the retry
    /// count, clears the lease, and re-enters `Pending`.
    pub fn requeue(&mut self, error: TaskError, now_ms: u64, cooldown: Option<Cooldown>) {
        self.retry_count += 1;
        self.state = TaskState::Pending;
        self.lease = None;
        self.pending_since_ms = now_ms;
        self.cooldown = cooldown;
        self.last_error = Some(error);
    }

    /// Fail terminally.
    pub fn fail(&mut self, error: TaskError) {
        self.state = TaskState::Failed;
        self.lease = None;
        self.last_error = Some(error);
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
