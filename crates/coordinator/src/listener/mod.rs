// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling protocol connections.
//!
//! Accepts TCP connections and spawns a task per connection; each
//! connection carries one framed request and receives one framed
//! response. Registry mutations happen inside short lock scopes; all
//! artifact I/O stays outside them.

mod artifacts;
mod jobs;
mod tasks;

use std::sync::Arc;
use std::time::Duration;

use cc_core::SystemClock;
use cc_wire::{read_request, write_response, ProtocolError, Request, Response};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

use crate::registry::Registry;
use crate::store::ArtifactStore;

/// Shared coordinator context for all request handlers.
pub struct ListenCtx {
    pub registry: Arc<Mutex<Registry<SystemClock>>>,
    pub store: Arc<ArtifactStore>,
    pub request_timeout: Duration,
}

/// Listener task for accepting protocol connections.
pub struct Listener {
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { tcp, ctx }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.tcp.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "connection accepted");
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("connection timeout"),
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single connection: one request, one response.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = read_request(&mut reader, ctx.request_timeout).await?;
    let response = handle_request(request, ctx).await;
    write_response(&mut writer, &response).await?;
    Ok(())
}

/// Dispatch a request to its handler.
pub async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::SubmitJob { shape, map_plugin, reduce_plugin, shards, params, inputs } => {
            jobs::submit(ctx, shape, map_plugin, reduce_plugin, shards, params, inputs).await
        }
        Request::GetJob { job_id } => jobs::get(ctx, &job_id),
        Request::CancelJob { job_id } => jobs::cancel(ctx, &job_id),

        Request::DownloadArtifact { job_id, name } => artifacts::download(ctx, &job_id, &name),
        Request::UploadArtifact { job_id, name, bytes } => {
            artifacts::upload(ctx, &job_id, &name, &bytes)
        }

        Request::ClaimTask { worker_id } => tasks::claim(ctx, &worker_id),
        Request::Heartbeat { worker_id, task_id } => tasks::heartbeat(ctx, &worker_id, &task_id),
        Request::ReportTask { worker_id, task_id, report } => {
            tasks::report(ctx, &worker_id, &task_id, report)
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
