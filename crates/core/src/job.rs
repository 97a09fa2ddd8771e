// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity, shape, and lifecycle.

use crate::task::{TaskError, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a submitted job.
    ///
    /// Assigned by the coordinator on submit; stable for the lifetime of
    /// the job and used to key its artifact directory.
    pub struct JobId("job-");
}

/// Shape of a job: one task, or a map fan-out chained into a reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobShape {
    Single,
    MapReduce,
}

crate::simple_display! {
    JobShape {
        Single => "single",
        MapReduce => "map_reduce",
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("map_reduce job requires a reduce plugin")]
    MissingReducePlugin,

    #[error("single job must not carry a reduce plugin")]
    UnexpectedReducePlugin,

    #[error("shard count must be at least 1")]
    ZeroShards,

    #[error("job requires at least one input artifact")]
    NoInputs,
}

/// Validated submission payload: what to run and how to fan it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub shape: JobShape,
    /// Plugin kind for the map (or single) tasks.
    pub map_plugin: String,
    /// Plugin kind for the reduce task; required iff `shape` is map_reduce.
    pub reduce_plugin: Option<String>,
    /// Requested shard count; meaningful only for map_reduce.
    pub shards: u32,
    /// Plugin-specific parameter bag, passed through to workers verbatim.
    pub params: BTreeMap<String, String>,
}

impl JobSpec {
    /// Check shape constraints against the submitted input count.
    pub fn validate(&self, input_count: usize) -> Result<(), SpecError> {
        if input_count == 0 {
            return Err(SpecError::NoInputs);
        }
        match self.shape {
            JobShape::Single => {
                if self.reduce_plugin.is_some() {
                    return Err(SpecError::UnexpectedReducePlugin);
                }
            }
            JobShape::MapReduce => {
                if self.reduce_plugin.is_none() {
                    return Err(SpecError::MissingReducePlugin);
                }
                if self.shards == 0 {
                    return Err(SpecError::ZeroShards);
                }
            }
        }
        Ok(())
    }
}

/// A registered job.
///
/// Jobs and tasks live in flat tables keyed by id; a job holds task ids,
/// never task references, and tasks point back via `JobId` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    pub state: JobState,
    pub created_at_ms: u64,
    /// Tasks in creation order: map tasks by shard index, reduce appended
    /// when the map stage completes.
    pub tasks: Vec<TaskId>,
    /// The task whose success completes the job. For map_reduce this is
    /// unset until the reduce task exists.
    pub terminal_task: Option<TaskId>,
    /// Name of the final output artifact, set when the job succeeds.
    pub final_output: Option<String>,
    /// Most recent task failure, kept for GetJob summaries.
    pub last_error: Option<TaskError>,
}

impl Job {
    pub fn new(id: JobId, spec: JobSpec, created_at_ms: u64) -> Self {
        Self {
            id,
            spec,
            state: JobState::Pending,
            created_at_ms,
            tasks: Vec::new(),
            terminal_task: None,
            final_output: None,
            last_error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
