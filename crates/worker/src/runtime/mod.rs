// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime capability interface.
//!
//! The worker treats the container runtime as an external capability:
//! spawn a sibling container over the host's Docker socket, wait for it,
//! kill it. Hiding it behind a trait keeps the agent testable with an
//! in-process fake that runs the plugin logic directly.

mod docker;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use docker::DockerRuntime;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBehavior, FakeRuntime};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// What to run: image, rendered argv, and the scratch directory that
/// becomes the container's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name; unique per task attempt.
    pub name: String,
    pub image: String,
    /// Argv with file arguments relative to the working directory.
    pub argv: Vec<String>,
    /// Host directory mounted as the container working directory.
    pub scratch_dir: PathBuf,
}

/// Terminal container state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerExit {
    pub code: i32,
    /// Tail of the container's stderr, for failure reports.
    pub stderr_tail: String,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("wait failed: {0}")]
    WaitFailed(String),

    #[error("no such container: {0}")]
    NotFound(String),
}

/// Capability interface over the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a detached container; it is addressed by `spec.name` from
    /// then on.
    async fn spawn(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    /// Wait for the container to exit and collect its status. Also
    /// releases the runtime's record of the container.
    async fn wait(&self, name: &str) -> Result<ContainerExit, RuntimeError>;

    /// Kill and remove the container.
    async fn kill(&self, name: &str) -> Result<(), RuntimeError>;
}

#[async_trait]
impl<T: ContainerRuntime + ?Sized> ContainerRuntime for std::sync::Arc<T> {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        (**self).spawn(spec).await
    }

    async fn wait(&self, name: &str) -> Result<ContainerExit, RuntimeError> {
        (**self).wait(name).await
    }

    async fn kill(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).kill(name).await
    }
}
