// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sibling containers via the Docker CLI.
//!
//! The agent runs with the host's Docker socket mounted, so containers
//! it spawns are peers rather than children. Lifecycle goes through the
//! `docker` binary: `run -d`, `wait`, `logs --tail`, `rm -f`.

use async_trait::async_trait;

use super::{ContainerExit, ContainerRuntime, ContainerSpec, RuntimeError};

/// Lines of stderr kept for failure reports.
const STDERR_TAIL_LINES: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let mount = format!("{}:/work", spec.scratch_dir.display());
        let mut args: Vec<&str> =
            vec!["run", "-d", "--name", &spec.name, "-v", &mount, "-w", "/work", &spec.image];
        args.extend(spec.argv.iter().map(String::as_str));

        tracing::info!(container = %spec.name, image = %spec.image, "spawning sibling container");
        run_docker(&args).await.map_err(RuntimeError::SpawnFailed)?;
        Ok(())
    }

    async fn wait(&self, name: &str) -> Result<ContainerExit, RuntimeError> {
        // `docker wait` blocks until exit and prints the status code
        let code_output = run_docker(&["wait", name]).await.map_err(RuntimeError::WaitFailed)?;
        let code: i32 = code_output
            .trim()
            .parse()
            .map_err(|_| RuntimeError::WaitFailed(format!("unparseable status {:?}", code_output)))?;

        let tail_arg = STDERR_TAIL_LINES.to_string();
        let stderr_tail = match run_docker_split(&["logs", "--tail", &tail_arg, name]).await {
            Ok((_, stderr)) => stderr,
            Err(_) => String::new(),
        };

        let _ = run_docker(&["rm", name]).await;
        Ok(ContainerExit { code, stderr_tail })
    }

    async fn kill(&self, name: &str) -> Result<(), RuntimeError> {
        tracing::info!(container = %name, "killing container");
        run_docker(&["rm", "-f", name])
            .await
            .map(|_| ())
            .map_err(RuntimeError::NotFound)
    }
}

/// Run a docker CLI command and return stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, String> {
    run_docker_split(args).await.map(|(stdout, _)| stdout)
}

/// Run a docker CLI command and return (stdout, stderr) on success.
async fn run_docker_split(args: &[&str]) -> Result<(String, String), String> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to exec docker: {}", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if output.status.success() {
        Ok((stdout, stderr))
    } else {
        Err(format!("docker {} failed: {}", args.first().unwrap_or(&""), stderr))
    }
}
