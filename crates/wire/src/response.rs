// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cc_core::JobId;
use serde::{Deserialize, Serialize};

use crate::types::{ClaimedTask, JobDetail};

/// Client-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

cc_core::simple_display! {
    ErrorKind {
        BadRequest => "bad_request",
        NotFound => "not_found",
        Conflict => "conflict",
        Internal => "internal",
    }
}

/// Heartbeat verdict for the holding worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatStatus {
    /// Lease extended; keep going.
    Ok,
    /// The task is no longer held by this worker — kill the container,
    /// abandon the scratch directory, upload nothing.
    Reassigned,
}

/// Response from the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Job registered
    JobSubmitted { job_id: JobId },

    /// Single job details
    Job { job: Option<Box<JobDetail>> },

    /// Artifact content
    Artifact {
        name: String,
        #[serde(with = "crate::bytes")]
        bytes: Vec<u8>,
        /// Hex SHA-256 of the content, for download verification.
        hash: String,
    },

    /// Claim result; `None` when no task is pending for this worker.
    Task { task: Option<ClaimedTask> },

    /// Heartbeat verdict
    HeartbeatStatus { status: BeatStatus },

    /// Error response
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }
}
