// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ccd` — the CrowdCompute coordinator daemon.

use std::io::Write;
use std::process::ExitCode;

use cc_coordinator::{env, Config, Coordinator};
use fs2::FileExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for fatal configuration errors.
const EXIT_CONFIG: u8 = 2;

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

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

async fn run(config: Config) -> Result<(), String> {
    std::fs::create_dir_all(&config.storage_root)
        .map_err(|e| format!("cannot create storage root: {}", e))?;

    // One coordinator per storage root: hold an exclusive lock for the
    // lifetime of the process.
    let lock_path = config.storage_root.join(".lock");
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| format!("cannot open lock file: {}", e))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| format!("storage root {} is already in use", config.storage_root.display()))?;
    lock_file.set_len(0).map_err(|e| format!("cannot truncate lock file: {}", e))?;
    writeln!(lock_file, "{}", std::process::id())
        .map_err(|e| format!("cannot write lock file: {}", e))?;

    let coordinator =
        Coordinator::start(config).await.map_err(|e| format!("startup failed: {}", e))?;

    tokio::signal::ctrl_c().await.map_err(|e| format!("signal error: {}", e))?;
    info!("shutting down");
    coordinator.shutdown();
    Ok(())
}
