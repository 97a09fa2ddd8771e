// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire client: one connection per request.

use cc_core::{JobId, TaskError, TaskId, WorkerId};
use cc_wire::{
    decode, encode, read_message, write_message, BeatStatus, ClaimedTask, ErrorKind,
    ProtocolError, Request, Response, TaskReport,
};
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach coordinator: {0}")]
    Connect(std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("coordinator rejected request ({kind}): {message}")]
    Coordinator { kind: ErrorKind, message: String },

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Connection-level failure, as opposed to a coordinator verdict.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Connect(_))
    }
}

/// Coordinator client for the worker agent.
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
}

impl Client {
    /// `addr` is `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = TcpStream::connect(&self.addr).await.map_err(ClientError::Connect)?;
        let payload = encode(request)?;
        write_message(&mut stream, &payload).await?;
        let response = read_message(&mut stream).await?;
        match decode::<Response>(&response)? {
            Response::Error { kind, message } => Err(ClientError::Coordinator { kind, message }),
            response => Ok(response),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.request(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn claim(&self, worker_id: &WorkerId) -> Result<Option<ClaimedTask>, ClientError> {
        let request = Request::ClaimTask { worker_id: worker_id.clone() };
        match self.request(&request).await? {
            Response::Task { task } => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn heartbeat(
        &self,
        worker_id: &WorkerId,
        task_id: &TaskId,
    ) -> Result<BeatStatus, ClientError> {
        let request = Request::Heartbeat { worker_id: worker_id.clone(), task_id: *task_id };
        match self.request(&request).await? {
            Response::HeartbeatStatus { status } => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub async fn download(
        &self,
        job_id: &JobId,
        name: &str,
    ) -> Result<(Vec<u8>, String), ClientError> {
        let request = Request::DownloadArtifact { job_id: *job_id, name: name.to_string() };
        match self.request(&request).await? {
            Response::Artifact { bytes, hash, .. } => Ok((bytes, hash)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn upload(
        &self,
        job_id: &JobId,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let request = Request::UploadArtifact { job_id: *job_id, name: name.to_string(), bytes };
        match self.request(&request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn report_success(
        &self,
        worker_id: &WorkerId,
        task_id: &TaskId,
        outputs: Vec<String>,
    ) -> Result<(), ClientError> {
        self.report(worker_id, task_id, TaskReport::Success { outputs }).await
    }

    pub async fn report_failure(
        &self,
        worker_id: &WorkerId,
        task_id: &TaskId,
        error: TaskError,
    ) -> Result<(), ClientError> {
        self.report(worker_id, task_id, TaskReport::Failure { error }).await
    }

    async fn report(
        &self,
        worker_id: &WorkerId,
        task_id: &TaskId,
        report: TaskReport,
    ) -> Result<(), ClientError> {
        let request =
            Request::ReportTask { worker_id: worker_id.clone(), task_id: *task_id, report };
        match self.request(&request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    ClientError::Unexpected(format!("{:?}", response))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
