// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the coordinator binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use cc_core::limits;
use thiserror::Error;

use crate::Config;

/// Default listen port when neither `COORDINATOR_PORT` nor a port in
/// `COORDINATOR_BASE_URL` is given.
pub const DEFAULT_PORT: u16 = 7070;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("no storage root: set STORAGE_ROOT or HOME")]
    NoStorageRoot,

    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

/// Resolve storage root: STORAGE_ROOT > ~/.local/state/crowdcompute
pub fn storage_root() -> Result<PathBuf, EnvError> {
    if let Ok(dir) = std::env::var("STORAGE_ROOT") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join("crowdcompute"))
        .ok_or(EnvError::NoStorageRoot)
}

/// Listen port: COORDINATOR_PORT > port of COORDINATOR_BASE_URL > 7070
pub fn listen_port() -> Result<u16, EnvError> {
    if let Ok(value) = std::env::var("COORDINATOR_PORT") {
        return value.parse().map_err(|_| EnvError::Invalid("COORDINATOR_PORT", value));
    }
    if let Ok(url) = std::env::var("COORDINATOR_BASE_URL") {
        if let Some(port) = port_of(&url) {
            return Ok(port);
        }
    }
    Ok(DEFAULT_PORT)
}

/// Extract a port from `host:port` or `scheme://host:port[/...]`.
fn port_of(url: &str) -> Option<u16> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host_port = rest.split('/').next().unwrap_or(rest);
    let (_, port) = host_port.rsplit_once(':')?;
    port.parse().ok()
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

/// Assemble the coordinator config from the environment.
pub fn config() -> Result<Config, EnvError> {
    let lease_ttl = duration_var("LEASE_TTL_MS", limits::DEFAULT_LEASE_TTL)?;
    Ok(Config {
        listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), listen_port()?),
        storage_root: storage_root()?,
        lease_ttl,
        worker_ttl: duration_var("WORKER_TTL_MS", limits::DEFAULT_WORKER_TTL)?,
        sweep_interval: duration_var("SWEEP_INTERVAL_MS", limits::sweep_interval(lease_ttl))?,
        request_timeout: duration_var("REQUEST_TIMEOUT_MS", Duration::from_secs(30))?,
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
