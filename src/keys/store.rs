//! Append-only age key store (`keys.txt`).
//!
//! Blocks are appended with a single blank line between them and
//! deduplicated by exact match of the secret key line. Every write is a
//! full atomic replacement of the file.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{KeyBlock, SecretKey};
use crate::atomic;
use crate::constants::{KEYS_DIR_MODE, KEYS_FILE_MODE};

/// Errors from the key store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read key store {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write key store {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Result of appending a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The block was written.
    Added,
    /// The secret key line was already in the file; nothing was written.
    AlreadyPresent,
}

/// Filesystem-backed key store.
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file content; a missing file reads as empty.
    pub fn read(&self) -> Result<String, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Append `block` unless `secret` is already present in the store.
    pub fn append(&self, block: &KeyBlock, secret: &SecretKey) -> Result<AppendOutcome, StoreError> {
        let existing = self.read()?;
        if existing.contains(secret.expose()) {
            tracing::debug!(path = %self.path.display(), "secret key already in store");
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let content = merge(&existing, block);
        self.harden_dirs();
        atomic::atomic_write(&self.path, content.as_bytes(), KEYS_FILE_MODE).map_err(|source| {
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        // The directory may have just been created by the write.
        self.harden_dirs();

        tracing::debug!(path = %self.path.display(), "appended key block");
        Ok(AppendOutcome::Added)
    }

    /// Restrict the key directory and its parent (`sops/age`, `sops`) to the owner.
    fn harden_dirs(&self) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        atomic::tighten_dir(dir, KEYS_DIR_MODE);
        if let Some(grandparent) = dir.parent() {
            atomic::tighten_dir(grandparent, KEYS_DIR_MODE);
        }
    }
}

/// Join existing store content and a new block with exactly one blank line.
pub fn merge(existing: &str, block: &KeyBlock) -> String {
    let mut content = String::with_capacity(existing.len() + block.as_str().len() + 2);
    content.push_str(existing);
    if !content.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        if !content.ends_with("\n\n") {
            content.push('\n');
        }
    }
    content.push_str(block.as_str());
    content
}
