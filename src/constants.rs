//! App-wide constants.
//!
//! Centralises the tool name, key formats, file locations, and environment
//! variable names so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "sops-init";

/// Name of the external age key utility looked up on `PATH`.
pub const KEYGEN_BIN: &str = "age-keygen";

/// Prefix every age secret key line starts with.
pub const SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

/// Prefix every age public key (recipient) starts with.
pub const PUBLIC_KEY_PREFIX: &str = "age1";

/// Fallback config directory under the home directory when
/// `XDG_CONFIG_HOME` is unset.
pub const DEFAULT_CONFIG_DIR: &str = ".config";

/// Path of the key store relative to the config base directory.
pub const KEYS_RELATIVE_PATH: [&str; 3] = ["sops", "age", "keys.txt"];

/// Policy filename created in the working directory.
pub const SOPS_CONFIG_FILENAME: &str = ".sops.yaml";

/// Files the generated policy encrypts.
pub const DEFAULT_PATH_REGEX: &str = r"kubernetes/secrets/.*\.(ya?ml)$";

/// Permissions for the key store file.
pub const KEYS_FILE_MODE: u32 = 0o600;

/// Permissions for directories holding key material.
pub const KEYS_DIR_MODE: u32 = 0o700;

/// Permissions for the policy file (no secret material).
pub const SOPS_CONFIG_MODE: u32 = 0o644;

// ── Environment variable names ──────────────────────────────────────

pub const ENV_XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
pub const ENV_HOME: &str = "HOME";
pub const ENV_PATH: &str = "PATH";
pub const ENV_KEYGEN: &str = "SOPS_INIT_AGE_KEYGEN";
pub const ENV_LOG: &str = "SOPS_INIT_LOG";
