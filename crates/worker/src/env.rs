// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary.

use std::path::PathBuf;
use std::time::Duration;

use cc_core::{limits, WorkerId};
use thiserror::Error;

use crate::agent::AgentConfig;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("COORDINATOR_URL is required")]
    MissingCoordinator,

    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

/// Coordinator address: COORDINATOR_URL (required), scheme stripped.
pub fn coordinator_addr() -> Result<String, EnvError> {
    let url = std::env::var("COORDINATOR_URL").map_err(|_| EnvError::MissingCoordinator)?;
    if url.trim().is_empty() {
        return Err(EnvError::MissingCoordinator);
    }
    Ok(host_port_of(&url).to_string())
}

/// `host:port` part of a URL that may or may not carry a scheme or path.
fn host_port_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest)
}

/// Worker identity: WORKER_ID, or a generated host-unique value.
pub fn worker_id() -> WorkerId {
    match std::env::var("WORKER_ID") {
        Ok(id) if !id.is_empty() => WorkerId::new(id),
        _ => WorkerId::new(format!("worker-{}", nanoid::nanoid!(10))),
    }
}

fn duration_var(name: &'static str, default: Duration) -> Result<Duration, EnvError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| EnvError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

fn u32_var(name: &'static str, default: u32) -> Result<u32, EnvError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| EnvError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

/// Assemble the agent config from the environment.
pub fn config() -> Result<AgentConfig, EnvError> {
    let work_dir = match std::env::var("WORK_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => std::env::temp_dir().join("crowdcompute"),
    };
    Ok(AgentConfig {
        coordinator: coordinator_addr()?,
        worker_id: worker_id(),
        poll_interval: duration_var("POLL_INTERVAL_MS", Duration::from_millis(500))?,
        max_poll_interval: duration_var("MAX_POLL_INTERVAL_MS", Duration::from_secs(10))?,
        lease_ttl: duration_var("LEASE_TTL_MS", limits::DEFAULT_LEASE_TTL)?,
        work_dir,
        unreachable_threshold: u32_var("UNREACHABLE_THRESHOLD", 10)?,
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
