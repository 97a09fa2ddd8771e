// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs shared between coordinator responses and clients.

use std::collections::BTreeMap;

use cc_core::{JobId, JobShape, JobState, TaskError, TaskId, TaskKind, TaskState, WorkerId};
use serde::{Deserialize, Serialize};

/// Per-task line in a job detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_index: Option<u32>,
    pub state: TaskState,
    pub retry_count: u32,
    /// Worker currently holding the task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<TaskError>,
}

/// Client-visible job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_id: JobId,
    pub shape: JobShape,
    pub state: JobState,
    pub created_at_ms: u64,
    /// Name of the final output artifact once the job has succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output_name: Option<String>,
    /// Most recent task failure recorded against the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<TaskError>,
    pub tasks: Vec<TaskSummary>,
}

/// Everything a worker needs to execute a claimed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedTask {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_index: Option<u32>,
    pub plugin_kind: String,
    /// Input artifact names to download from the parent job.
    pub inputs: Vec<String>,
    /// Artifact names to upload before reporting success.
    pub expected_outputs: Vec<String>,
    /// Job parameter bag, passed to argv substitution.
    pub params: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
