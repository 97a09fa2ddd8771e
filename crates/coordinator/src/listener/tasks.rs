// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch handlers: claim, heartbeat, report.

use cc_core::{TaskId, WorkerId};
use cc_wire::{BeatStatus, ClaimedTask, ErrorKind, Response, TaskReport};

use super::ListenCtx;
use crate::registry::RegistryError;

/// ClaimTask: hand the oldest pending task to the worker, or none.
pub(super) fn claim(ctx: &ListenCtx, worker_id: &WorkerId) -> Response {
    let work = ctx.registry.lock().claim(worker_id);
    let task = work.map(|w| ClaimedTask {
        task_id: w.task.id,
        job_id: w.task.job,
        kind: w.task.kind,
        shard_index: w.task.shard_index,
        plugin_kind: w.task.plugin_kind,
        inputs: w.task.inputs,
        expected_outputs: w.task.expected_outputs,
        params: w.params,
    });
    Response::Task { task }
}

/// Heartbeat: extend the lease, or tell the worker to abandon the task.
pub(super) fn heartbeat(ctx: &ListenCtx, worker_id: &WorkerId, task_id: &TaskId) -> Response {
    let held = ctx.registry.lock().heartbeat(worker_id, task_id);
    let status = if held { BeatStatus::Ok } else { BeatStatus::Reassigned };
    Response::HeartbeatStatus { status }
}

/// ReportTask: commit a success (after verifying uploads) or a failure.
pub(super) fn report(
    ctx: &ListenCtx,
    worker_id: &WorkerId,
    task_id: &TaskId,
    report: TaskReport,
) -> Response {
    let result = match report {
        TaskReport::Success { outputs } => {
            // Every reported output must already be in the store; check
            // before taking the registry lock.
            let job_id = ctx.registry.lock().task_job(task_id);
            let Some(job_id) = job_id else {
                return Response::error(ErrorKind::NotFound, "unknown task");
            };
            for name in &outputs {
                if !ctx.store.exists(&job_id, name) {
                    return Response::error(
                        ErrorKind::BadRequest,
                        format!("reported output {:?} was never uploaded", name),
                    );
                }
            }
            ctx.registry.lock().report_success(worker_id, task_id, &outputs)
        }
        TaskReport::Failure { error } => {
            ctx.registry.lock().report_failure(worker_id, task_id, error)
        }
    };

    match result {
        Ok(()) => Response::Ok,
        Err(RegistryError::UnknownTask) => Response::error(ErrorKind::NotFound, "unknown task"),
        Err(RegistryError::OutputMismatch) => {
            Response::error(ErrorKind::BadRequest, RegistryError::OutputMismatch.to_string())
        }
        Err(e) => Response::error(ErrorKind::Conflict, e.to_string()),
    }
}
