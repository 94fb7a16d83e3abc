//! Settings struct and resolution logic.
//!
//! Priority for the config base directory (highest to lowest):
//! 1. `XDG_CONFIG_HOME` (when set and non-empty)
//! 2. `<home>/.config`, where home is `HOME` or, failing that, the
//!    platform home directory
//!
//! The key utility is `SOPS_INIT_AGE_KEYGEN` when set, `age-keygen` otherwise.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CONFIG_DIR, ENV_HOME, ENV_KEYGEN, ENV_XDG_CONFIG_HOME, KEYGEN_BIN, KEYS_RELATIVE_PATH,
    SOPS_CONFIG_FILENAME,
};
use crate::env::Env;

/// Errors during settings resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the config directory: set XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base configuration directory (`$XDG_CONFIG_HOME` or `~/.config`).
    pub config_base: PathBuf,
}

impl Settings {
    /// Resolve settings from the environment.
    pub fn resolve(env: &Env) -> Result<Self, ConfigError> {
        Self::resolve_with_home(env, dirs::home_dir())
    }

    /// Resolve with an explicit fallback for when `HOME` is unset.
    pub fn resolve_with_home(
        env: &Env,
        fallback_home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config_base = match env.non_empty(ENV_XDG_CONFIG_HOME) {
            Some(xdg) => PathBuf::from(xdg),
            None => env
                .non_empty(ENV_HOME)
                .map(PathBuf::from)
                .or(fallback_home)
                .ok_or(ConfigError::NoConfigDir)?
                .join(DEFAULT_CONFIG_DIR),
        };

        Ok(Self { config_base })
    }

    /// Key utility to locate. Needs no filesystem state, so it can be
    /// checked before anything else is resolved.
    pub fn keygen_name(env: &Env) -> String {
        env.non_empty(ENV_KEYGEN)
            .unwrap_or_else(|| KEYGEN_BIN.to_string())
    }

    /// Path of the age key store SOPS reads (`<base>/sops/age/keys.txt`).
    pub fn keys_path(&self) -> PathBuf {
        KEYS_RELATIVE_PATH
            .iter()
            .fold(self.config_base.clone(), |acc, part| acc.join(part))
    }

    /// Path of the policy file for a given working directory.
    pub fn sops_config_path(cwd: &Path) -> PathBuf {
        cwd.join(SOPS_CONFIG_FILENAME)
    }
}
