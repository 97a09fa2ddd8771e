// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CrowdCompute coordinator: artifact store, job/task registry, and the
//! dispatch protocol listener.
//!
//! The registry is a single owned structure behind one mutex; request
//! handlers lock it briefly for pure-memory transitions and do all
//! artifact I/O outside the critical section.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod listener;
pub mod registry;
pub mod store;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cc_core::{limits, SystemClock};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use listener::{ListenCtx, Listener};
use registry::{Registry, RegistryConfig};
use store::ArtifactStore;

/// Coordinator configuration, resolved from the environment by the
/// binary or built directly by tests.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub storage_root: PathBuf,
    pub lease_ttl: Duration,
    pub worker_ttl: Duration,
    pub sweep_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Config with default tuning for the given listen address and root.
    pub fn new(listen: SocketAddr, storage_root: PathBuf) -> Self {
        Self {
            listen,
            storage_root,
            lease_ttl: limits::DEFAULT_LEASE_TTL,
            worker_ttl: limits::DEFAULT_WORKER_TTL,
            sweep_interval: limits::sweep_interval(limits::DEFAULT_LEASE_TTL),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to prepare storage root {0}: {1}")]
    Storage(PathBuf, std::io::Error),

    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, std::io::Error),
}

/// A running coordinator: listener plus lease sweeper.
pub struct Coordinator {
    /// Bound address (differs from the configured one when port 0 was
    /// requested).
    pub addr: SocketAddr,
    listener: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl Coordinator {
    /// Bind the listener, spawn it and the sweeper, and return.
    pub async fn start(config: Config) -> Result<Self, StartError> {
        std::fs::create_dir_all(&config.storage_root)
            .map_err(|e| StartError::Storage(config.storage_root.clone(), e))?;

        let store = Arc::new(ArtifactStore::new(config.storage_root.clone()));
        let registry = Arc::new(Mutex::new(Registry::new(
            SystemClock,
            RegistryConfig {
                lease_ttl: config.lease_ttl,
                worker_ttl: config.worker_ttl,
                cooldown: limits::redispatch_cooldown(config.lease_ttl),
            },
        )));

        let tcp = tokio::net::TcpListener::bind(config.listen)
            .await
            .map_err(|e| StartError::Bind(config.listen, e))?;
        let addr = tcp.local_addr().map_err(|e| StartError::Bind(config.listen, e))?;

        let ctx = Arc::new(ListenCtx {
            registry: Arc::clone(&registry),
            store,
            request_timeout: config.request_timeout,
        });

        let listener = tokio::spawn(Listener::new(tcp, ctx).run());
        let sweeper = tokio::spawn(registry::sweep::run(registry, config.sweep_interval));

        info!(%addr, root = %config.storage_root.display(), "coordinator listening");
        Ok(Self { addr, listener, sweeper })
    }

    /// Stop the listener and sweeper tasks.
    pub fn shutdown(&self) {
        self.listener.abort();
        self.sweeper.abort();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
