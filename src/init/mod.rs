//! Key provisioning pipeline.
//!
//! [`Installer::prepare`] checks for the key utility and resolves paths.
//! [`Installer::acquire_generated`] or [`Installer::acquire_prompted`]
//! obtains a validated key pair, and [`Installer::install`] writes the key
//! store and the SOPS policy. Nothing is written until a key pair has been
//! fully validated.

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::config::{ConfigError, Settings};
use crate::constants::SECRET_KEY_PREFIX;
use crate::env::Env;
use crate::input::SecretInput;
use crate::keygen::{Keygen, KeygenError};
use crate::keys::store::{AppendOutcome, KeyStore, StoreError};
use crate::keys::{KeyBlock, KeyPair, extract_secret_key};
use crate::policy::{self, PolicyError, PolicyOutcome};

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const NO_SECRET_KEY: i32 = 2;
    pub const DERIVE_FAILED: i32 = 3;
    pub const KEYGEN_MISSING: i32 = 127;
}

/// How the key is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create a fresh key pair with `age-keygen`.
    Generate,
    /// Ask the operator for an existing secret key.
    Prompt,
}

/// Errors from the provisioning pipeline.
#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    KeygenMissing(KeygenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generate(KeygenError),

    #[error("Did not detect a valid '{prefix}' line.", prefix = SECRET_KEY_PREFIX)]
    NoSecretKey,

    #[error("failed to read private key: {0}")]
    Input(#[source] std::io::Error),

    #[error(transparent)]
    Derive(KeygenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl InitError {
    /// Exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::KeygenMissing(_) => exit::KEYGEN_MISSING,
            Self::NoSecretKey | Self::Input(_) => exit::NO_SECRET_KEY,
            Self::Derive(_) => exit::DERIVE_FAILED,
            Self::Config(_) | Self::Generate(_) | Self::Store(_) | Self::Policy(_) => {
                exit::FAILURE
            }
        }
    }
}

/// A validated key ready to be stored.
#[derive(Debug)]
pub struct AcquiredKey {
    pub block: KeyBlock,
    pub pair: KeyPair,
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct InitReport {
    pub public_key: String,
    pub keys_path: PathBuf,
    pub key_outcome: AppendOutcome,
    pub sops_config: PathBuf,
    pub policy_outcome: PolicyOutcome,
}

/// Provisioning context for one run.
#[derive(Debug)]
pub struct Installer {
    keygen: Keygen,
    settings: Settings,
    cwd: PathBuf,
}

impl Installer {
    /// Locate the key utility, then resolve the key store location.
    ///
    /// The utility check comes first so a missing dependency is reported
    /// before any path is printed or touched.
    pub fn prepare(env: &Env, cwd: impl Into<PathBuf>) -> Result<Self, InitError> {
        let keygen =
            Keygen::locate(&Settings::keygen_name(env), env).map_err(InitError::KeygenMissing)?;
        let settings = Settings::resolve(env)?;
        Ok(Self {
            keygen,
            settings,
            cwd: cwd.into(),
        })
    }

    pub fn keys_path(&self) -> PathBuf {
        self.settings.keys_path()
    }

    pub fn keygen(&self) -> &Keygen {
        &self.keygen
    }

    /// Generate a fresh key pair with the key utility.
    pub fn acquire_generated(&self) -> Result<AcquiredKey, InitError> {
        let generated = self.keygen.generate().map_err(InitError::Generate)?;
        Ok(AcquiredKey {
            block: generated.block,
            pair: generated.pair,
        })
    }

    /// Ask the operator for an existing secret key and derive its recipient.
    pub fn acquire_prompted(&self, input: &mut dyn SecretInput) -> Result<AcquiredKey, InitError> {
        let visibility = if input.echoes() {
            "Input will be visible; paste and press Enter."
        } else {
            "Input is hidden; paste and press Enter."
        };
        eprintln!(
            "Enter your Age private key (the single line starting with '{SECRET_KEY_PREFIX}').\n{visibility}"
        );

        let raw = input.read_secret("> ").map_err(InitError::Input)?;
        let secret = extract_secret_key(&raw).ok_or(InitError::NoSecretKey)?;
        let public = self
            .keygen
            .derive_from_secret(&secret)
            .map_err(InitError::Derive)?;

        let pair = KeyPair { secret, public };
        Ok(AcquiredKey {
            block: KeyBlock::compose(&pair, Utc::now()),
            pair,
        })
    }

    /// Append the key to the store and make sure a SOPS policy exists.
    pub fn install(&self, key: &AcquiredKey) -> Result<InitReport, InitError> {
        let store = KeyStore::new(self.keys_path());
        let key_outcome = store.append(&key.block, &key.pair.secret)?;
        let (sops_config, policy_outcome) = policy::ensure_sops_config(&self.cwd, &key.pair.public)?;

        Ok(InitReport {
            public_key: key.pair.public.to_string(),
            keys_path: store.path().to_path_buf(),
            key_outcome,
            sops_config,
            policy_outcome,
        })
    }
}
