//! `.sops.yaml` bootstrap.
//!
//! Writes a minimal SOPS policy mapping the Kubernetes secrets directory
//! to the given age recipient. An existing policy file is never read,
//! merged, or rewritten.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic;
use crate::config::Settings;
use crate::constants::{APP_NAME, DEFAULT_PATH_REGEX, SOPS_CONFIG_MODE};
use crate::keys::PublicKey;

/// Errors from policy initialisation.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to render SOPS config: {0}")]
    Render(#[from] serde_yaml_ng::Error),

    #[error("failed to check SOPS config {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to write SOPS config {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Top level of a `.sops.yaml` file (the subset this tool writes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopsConfig {
    pub creation_rules: Vec<CreationRule>,
}

/// One `creation_rules` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRule {
    pub path_regex: String,
    pub age: Vec<String>,
}

impl SopsConfig {
    /// Single rule encrypting `path_regex` matches for one recipient.
    pub fn for_recipient(public: &PublicKey, path_regex: &str) -> Self {
        Self {
            creation_rules: vec![CreationRule {
                path_regex: path_regex.to_string(),
                age: vec![public.as_str().to_string()],
            }],
        }
    }

    /// YAML document with a short provenance header.
    pub fn render(&self) -> Result<String, PolicyError> {
        let body = serde_yaml_ng::to_string(self)?;
        Ok(format!(
            "# Managed by {APP_NAME}\n\
             # Uses Age public key to encrypt files matched by creation_rules.\n\
             {body}"
        ))
    }
}

/// Whether the policy file was written by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Created,
    Existing,
}

/// Create `<cwd>/.sops.yaml` for `public` unless something is already there.
pub fn ensure_sops_config(
    cwd: &Path,
    public: &PublicKey,
) -> Result<(PathBuf, PolicyOutcome), PolicyError> {
    let path = Settings::sops_config_path(cwd);

    // Anything at the path counts as present, including a dangling symlink.
    match std::fs::symlink_metadata(&path) {
        Ok(_) => {
            tracing::debug!(path = %path.display(), "SOPS config exists, leaving it untouched");
            return Ok((path, PolicyOutcome::Existing));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(PolicyError::Stat { path, source }),
    }

    let content = SopsConfig::for_recipient(public, DEFAULT_PATH_REGEX).render()?;
    if let Err(source) = atomic::atomic_write(&path, content.as_bytes(), SOPS_CONFIG_MODE) {
        return Err(PolicyError::Write { path, source });
    }

    Ok((path, PolicyOutcome::Created))
}
