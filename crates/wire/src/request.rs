// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use cc_core::{JobId, JobShape, TaskError, TaskId, WorkerId};
use serde::{Deserialize, Serialize};

/// One named input artifact carried with a job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputUpload {
    pub name: String,
    #[serde(with = "crate::bytes")]
    pub bytes: Vec<u8>,
}

/// Outcome of a task attempt, reported by the executing worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskReport {
    /// All declared outputs were uploaded first.
    Success { outputs: Vec<String> },
    Failure { error: TaskError },
}

/// Request from a client or worker to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Register a job: shape, plugins, params, and its input artifacts.
    /// Registration is synchronous; execution is not.
    SubmitJob {
        shape: JobShape,
        map_plugin: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reduce_plugin: Option<String>,
        /// Requested map fan-out; ignored for single jobs.
        #[serde(default)]
        shards: Option<u32>,
        #[serde(default)]
        params: BTreeMap<String, String>,
        inputs: Vec<InputUpload>,
    },

    /// Fetch job state and task summaries.
    GetJob { job_id: JobId },

    /// Cancel a job; in-flight holders learn via heartbeat.
    CancelJob { job_id: JobId },

    /// Fetch a finalized artifact.
    DownloadArtifact { job_id: JobId, name: String },

    /// Upload a task output artifact. Only names declared as an expected
    /// output of an unfinished task in the job are accepted.
    UploadArtifact {
        job_id: JobId,
        name: String,
        #[serde(with = "crate::bytes")]
        bytes: Vec<u8>,
    },

    /// Ask for work. `None` in the response means nothing is pending.
    ClaimTask { worker_id: WorkerId },

    /// Extend the lease on a held task.
    Heartbeat { worker_id: WorkerId, task_id: TaskId },

    /// Commit the outcome of a task attempt.
    ReportTask { worker_id: WorkerId, task_id: TaskId, report: TaskReport },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
