// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission, lookup, and cancellation handlers.

use std::collections::BTreeMap;

use cc_core::{shard_name, shard_slices, JobId, JobShape, JobSpec};
use cc_wire::{ErrorKind, InputUpload, JobDetail, Response, TaskSummary};
use tracing::info;

use super::ListenCtx;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// SubmitJob: validate, persist inputs (and shards), register the job.
///
/// Registration is synchronous; execution is not. On any artifact
/// failure the half-written job directory is dropped so a retried
/// submission starts clean.
pub(super) async fn submit(
    ctx: &ListenCtx,
    shape: JobShape,
    map_plugin: String,
    reduce_plugin: Option<String>,
    shards: Option<u32>,
    params: BTreeMap<String, String>,
    inputs: Vec<InputUpload>,
) -> Response {
    let spec = JobSpec {
        shape,
        map_plugin,
        reduce_plugin,
        shards: shards.unwrap_or(1),
        params,
    };
    if let Err(e) = spec.validate(inputs.len()) {
        return Response::error(ErrorKind::BadRequest, e.to_string());
    }

    let job_id = JobId::new();
    if let Err(e) = write_artifacts(ctx, &job_id, &spec, &inputs) {
        // Leave no partial job behind
        let _ = ctx.store.drop_job(&job_id);
        return e;
    }

    let input_names: Vec<String> = inputs.into_iter().map(|i| i.name).collect();
    ctx.registry.lock().register_job(job_id, spec, &input_names);

    info!(%job_id, "job submitted");
    Response::JobSubmitted { job_id }
}

/// Persist the uploaded inputs and, for map_reduce, the shard artifacts
/// cut from the first (designated) input.
fn write_artifacts(
    ctx: &ListenCtx,
    job_id: &JobId,
    spec: &JobSpec,
    inputs: &[InputUpload],
) -> Result<(), Response> {
    let store = &ctx.store;
    store.create_job(job_id).map_err(internal)?;

    for input in inputs {
        match store.put(job_id, &input.name, &input.bytes) {
            Ok(_) => {}
            Err(StoreError::InvalidName(name)) => {
                return Err(Response::error(
                    ErrorKind::BadRequest,
                    format!("invalid input name: {:?}", name),
                ));
            }
            Err(StoreError::Conflict) => {
                return Err(Response::error(
                    ErrorKind::BadRequest,
                    format!("duplicate input name: {:?}", input.name),
                ));
            }
            Err(e) => return Err(internal(e)),
        }
    }

    if spec.shape == JobShape::MapReduce {
        // inputs is non-empty (validated above); the first is sharded
        let designated = &inputs[0];
        for (index, slice) in shard_slices(&designated.bytes, spec.shards).iter().enumerate() {
            store.put(job_id, &shard_name(index as u32), slice).map_err(internal)?;
        }
    }

    Ok(())
}

fn internal(e: impl std::fmt::Display) -> Response {
    Response::error(ErrorKind::Internal, e.to_string())
}

/// GetJob: assemble the detail view from a registry snapshot.
pub(super) fn get(ctx: &ListenCtx, job_id: &JobId) -> Response {
    let snapshot = ctx.registry.lock().job_snapshot(job_id);
    let Some((job, tasks)) = snapshot else {
        return Response::Job { job: None };
    };

    let tasks = tasks
        .into_iter()
        .map(|t| TaskSummary {
            task_id: t.id,
            kind: t.kind,
            shard_index: t.shard_index,
            state: t.state,
            retry_count: t.retry_count,
            worker: t.holder().cloned(),
            last_error: t.last_error,
        })
        .collect();

    Response::Job {
        job: Some(Box::new(JobDetail {
            job_id: job.id,
            shape: job.spec.shape,
            state: job.state,
            created_at_ms: job.created_at_ms,
            final_output_name: job.final_output,
            last_error: job.last_error,
            tasks,
        })),
    }
}

/// CancelJob: mark cancelled; holders learn via heartbeat.
pub(super) fn cancel(ctx: &ListenCtx, job_id: &JobId) -> Response {
    match ctx.registry.lock().cancel(job_id) {
        Ok(()) => Response::Ok,
        Err(RegistryError::UnknownJob) => Response::error(ErrorKind::NotFound, "unknown job"),
        Err(e) => Response::error(ErrorKind::Conflict, e.to_string()),
    }
}
