// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process container runtime for tests.
//!
//! Runs the built-in plugin logic directly against the scratch
//! directory, with scriptable failure behaviors for the error paths.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{ContainerExit, ContainerRuntime, ContainerSpec, RuntimeError};

/// What spawned containers do when waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Execute the plugin logic in-process.
    Run,
    /// Exit with the given code without touching outputs.
    Exit(i32),
    /// Block until killed, then exit 137.
    Hang,
    /// Exit zero without writing outputs.
    SkipOutputs,
}

struct FakeContainer {
    spec: ContainerSpec,
    killed: Arc<Notify>,
}

/// Fake runtime: containers are table entries, plugins run in-process.
pub struct FakeRuntime {
    behavior: FakeBehavior,
    containers: Mutex<HashMap<String, FakeContainer>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::with_behavior(FakeBehavior::Run)
    }

    pub fn with_behavior(behavior: FakeBehavior) -> Self {
        Self { behavior, containers: Mutex::new(HashMap::new()) }
    }

    /// Names of containers currently alive (spawned, not yet waited).
    pub fn running(&self) -> Vec<String> {
        self.containers.lock().keys().cloned().collect()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock();
        if containers.contains_key(&spec.name) {
            return Err(RuntimeError::SpawnFailed(format!("name in use: {}", spec.name)));
        }
        containers.insert(
            spec.name.clone(),
            FakeContainer { spec: spec.clone(), killed: Arc::new(Notify::new()) },
        );
        Ok(())
    }

    async fn wait(&self, name: &str) -> Result<ContainerExit, RuntimeError> {
        let (spec, killed) = {
            let containers = self.containers.lock();
            let container =
                containers.get(name).ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
            (container.spec.clone(), Arc::clone(&container.killed))
        };

        let exit = match self.behavior {
            FakeBehavior::Run => run_plugin(&spec),
            FakeBehavior::Exit(code) => {
                ContainerExit { code, stderr_tail: "injected failure".to_string() }
            }
            FakeBehavior::SkipOutputs => ContainerExit { code: 0, stderr_tail: String::new() },
            FakeBehavior::Hang => {
                killed.notified().await;
                ContainerExit { code: 137, stderr_tail: "killed".to_string() }
            }
        };

        self.containers.lock().remove(name);
        Ok(exit)
    }

    async fn kill(&self, name: &str) -> Result<(), RuntimeError> {
        // Mirrors `docker rm -f`: the container is gone immediately; a
        // concurrent wait still observes the kill via its own handle.
        let container = self
            .containers
            .lock()
            .remove(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        container.killed.notify_one();
        Ok(())
    }
}

fn exit(code: i32, stderr: impl Into<String>) -> ContainerExit {
    ContainerExit { code, stderr_tail: stderr.into() }
}

/// Dispatch on the command name, mirroring what the real images run.
fn run_plugin(spec: &ContainerSpec) -> ContainerExit {
    match spec.argv.first().map(String::as_str) {
        Some("hashcat") => fake_hashcat(&spec.scratch_dir, &spec.argv[1..]),
        Some("sort") => fake_sort(&spec.scratch_dir, &spec.argv[1..]),
        Some(other) => exit(127, format!("{}: command not found", other)),
        None => exit(127, "empty argv"),
    }
}

fn md5_hex(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// MD5 dictionary attack: try every wordlist line against the target.
fn fake_hashcat(dir: &Path, args: &[String]) -> ContainerExit {
    let mut mode = None;
    let mut outfile = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-m" => mode = iter.next().cloned(),
            "-a" => {
                let _ = iter.next();
            }
            "--outfile" => outfile = iter.next().cloned(),
            "--potfile-disable" => {}
            other => positional.push(other.to_string()),
        }
    }

    if mode.as_deref() != Some("0") {
        return exit(1, format!("unsupported hash mode {:?}", mode));
    }
    let Some(outfile) = outfile else {
        return exit(1, "no --outfile given");
    };
    let [target_hash, wordlist] = positional.as_slice() else {
        return exit(1, format!("expected <hash> <wordlist>, got {:?}", positional));
    };

    let words = match std::fs::read_to_string(dir.join(wordlist)) {
        Ok(words) => words,
        Err(e) => return exit(2, format!("cannot read {}: {}", wordlist, e)),
    };

    let target = target_hash.to_ascii_lowercase();
    for word in words.lines() {
        if md5_hex(word.as_bytes()) == target {
            return match std::fs::write(dir.join(&outfile), format!("{}\n", word)) {
                Ok(()) => exit(0, ""),
                Err(e) => exit(2, format!("cannot write {}: {}", outfile, e)),
            };
        }
    }
    exit(1, "exhausted")
}

/// `sort [-m] -o <out> <inputs...>`: stable sort preserving duplicates.
fn fake_sort(dir: &Path, args: &[String]) -> ContainerExit {
    let mut out = None;
    let mut inputs = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            // Merge mode sorts already-sorted inputs; the stable sort
            // below subsumes it.
            "-m" => {}
            "-o" => out = iter.next().cloned(),
            other => inputs.push(other.to_string()),
        }
    }

    let Some(out) = out else {
        return exit(1, "no -o given");
    };

    let mut lines: Vec<String> = Vec::new();
    for input in &inputs {
        match std::fs::read_to_string(dir.join(input)) {
            Ok(content) => lines.extend(content.lines().map(str::to_string)),
            Err(e) => return exit(2, format!("cannot read {}: {}", input, e)),
        }
    }
    lines.sort();

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    match std::fs::write(dir.join(&out), content) {
        Ok(()) => exit(0, ""),
        Err(e) => exit(2, format!("cannot write {}: {}", out, e)),
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
