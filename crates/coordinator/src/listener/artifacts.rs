// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact download and upload handlers.

use cc_core::JobId;
use cc_wire::{ErrorKind, Response};

use super::ListenCtx;
use crate::store::StoreError;

/// DownloadArtifact: serve a finalized artifact with its content hash.
pub(super) fn download(ctx: &ListenCtx, job_id: &JobId, name: &str) -> Response {
    match ctx.store.get(job_id, name) {
        Ok((bytes, hash)) => Response::Artifact { name: name.to_string(), bytes, hash },
        Err(StoreError::NotFound) => Response::error(ErrorKind::NotFound, "artifact not found"),
        Err(StoreError::InvalidName(name)) => {
            Response::error(ErrorKind::BadRequest, format!("invalid artifact name: {:?}", name))
        }
        Err(e) => Response::error(ErrorKind::Internal, e.to_string()),
    }
}

/// UploadArtifact: accept a task output.
///
/// Only names declared as an expected output of an unfinished task in
/// the job are accepted; anything else is a bad request.
pub(super) fn upload(ctx: &ListenCtx, job_id: &JobId, name: &str, bytes: &[u8]) -> Response {
    let expected = match ctx.registry.lock().is_expected_output(job_id, name) {
        Ok(expected) => expected,
        Err(_) => return Response::error(ErrorKind::NotFound, "unknown job"),
    };
    if !expected {
        return Response::error(
            ErrorKind::BadRequest,
            format!("{:?} is not a declared output of any unfinished task", name),
        );
    }

    match ctx.store.put(job_id, name, bytes) {
        Ok(_) => Response::Ok,
        Err(StoreError::Conflict) => {
            Response::error(ErrorKind::Conflict, "artifact already finalized")
        }
        Err(StoreError::JobUnknown) => Response::error(ErrorKind::NotFound, "unknown job"),
        Err(StoreError::InvalidName(name)) => {
            Response::error(ErrorKind::BadRequest, format!("invalid artifact name: {:?}", name))
        }
        Err(e) => Response::error(ErrorKind::Internal, e.to_string()),
    }
}
