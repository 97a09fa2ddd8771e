// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed artifact store, keyed by `(job_id, name)`.
//!
//! Layout at rest: one directory per job, one file per artifact.
//! Writers stage into `.tmp-<name>-<nonce>` in the same directory and
//! rename on success, so readers never observe partial bytes. Dot-files
//! are invisible: an artifact exists iff its final name does.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cc_core::JobId;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown job")]
    JobUnknown,

    #[error("artifact not found")]
    NotFound,

    #[error("artifact already finalized")]
    Conflict,

    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reference to a finalized artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub size: u64,
    /// Hex SHA-256 of the content.
    pub hash: String,
}

/// Hex SHA-256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_dir(&self, job: &JobId) -> PathBuf {
        self.root.join(job.as_str())
    }

    /// Artifact names map directly to file names, so path separators and
    /// dot-prefixes (reserved for staging files) are rejected.
    fn validate_name(name: &str) -> Result<(), StoreError> {
        let ok = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name != "..";
        if ok {
            Ok(())
        } else {
            Err(StoreError::InvalidName(name.to_string()))
        }
    }

    /// Create the directory for a new job.
    pub fn create_job(&self, job: &JobId) -> Result<(), StoreError> {
        std::fs::create_dir_all(self.job_dir(job))?;
        Ok(())
    }

    pub fn job_exists(&self, job: &JobId) -> bool {
        self.job_dir(job).is_dir()
    }

    /// Finalize an artifact atomically (stage + rename).
    pub fn put(&self, job: &JobId, name: &str, bytes: &[u8]) -> Result<ArtifactRef, StoreError> {
        Self::validate_name(name)?;
        let dir = self.job_dir(job);
        if !dir.is_dir() {
            return Err(StoreError::JobUnknown);
        }

        let final_path = dir.join(name);
        if final_path.exists() {
            return Err(StoreError::Conflict);
        }

        let tmp_path = dir.join(format!(".tmp-{}-{}", name, nanoid::nanoid!(8)));
        std::fs::write(&tmp_path, bytes)?;
        if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(ArtifactRef { name: name.to_string(), size: bytes.len() as u64, hash: content_hash(bytes) })
    }

    /// Read a finalized artifact and its content hash.
    pub fn get(&self, job: &JobId, name: &str) -> Result<(Vec<u8>, String), StoreError> {
        Self::validate_name(name)?;
        let path = self.job_dir(job).join(name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let hash = content_hash(&bytes);
                Ok((bytes, hash))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, job: &JobId, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.job_dir(job).join(name).is_file()
    }

    /// Finalized artifact names in creation order, ties broken
    /// lexicographically.
    pub fn list(&self, job: &JobId) -> Result<Vec<String>, StoreError> {
        let dir = self.job_dir(job);
        if !dir.is_dir() {
            return Err(StoreError::JobUnknown);
        }

        let mut entries: Vec<(SystemTime, String)> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let created = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((created, name));
        }
        entries.sort();
        Ok(entries.into_iter().map(|(_, name)| name).collect())
    }

    /// Remove all artifacts for a job, atomically from the reader's
    /// perspective: the directory is renamed away first, then deleted.
    pub fn drop_job(&self, job: &JobId) -> Result<(), StoreError> {
        let dir = self.job_dir(job);
        if !dir.is_dir() {
            return Err(StoreError::JobUnknown);
        }
        let doomed = self.root.join(format!(".drop-{}-{}", job.as_str(), nanoid::nanoid!(8)));
        std::fs::rename(&dir, &doomed)?;
        std::fs::remove_dir_all(&doomed)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
