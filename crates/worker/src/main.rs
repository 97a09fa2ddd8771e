// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ccw` — the CrowdCompute worker agent.
//!
//! Exit codes: 0 graceful shutdown, 2 fatal configuration error,
//! 3 coordinator unreachable past the retry threshold.

use std::process::ExitCode;

use cc_worker::runtime::DockerRuntime;
use cc_worker::{env, Agent, AgentError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_CONFIG: u8 = 2;
const EXIT_UNREACHABLE: u8 = 3;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match env::config() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&config.work_dir) {
        error!("cannot create work dir {}: {}", config.work_dir.display(), e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let agent = Agent::new(config, DockerRuntime::new());
    let shutdown = agent.shutdown_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current task");
            shutdown.cancel();
        }
    });

    match agent.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ AgentError::Unreachable(_)) => {
            error!("{}", e);
            ExitCode::from(EXIT_UNREACHABLE)
        }
    }
}
