//! age key types, secret-line extraction, and key block composition.

pub mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::constants::{PUBLIC_KEY_PREFIX, SECRET_KEY_PREFIX};

/// A single `AGE-SECRET-KEY-…` line. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Zeroizing<String>);

impl SecretKey {
    /// Accept a line as a secret key if, once trimmed, it carries the age prefix.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        line.starts_with(SECRET_KEY_PREFIX)
            .then(|| Self(Zeroizing::new(line.to_string())))
    }

    /// The secret line as written to the key store.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// An age recipient (`age1…`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    /// Accept trimmed utility output as a public key if it carries the age prefix.
    pub fn parse(output: &str) -> Option<Self> {
        let key = output.trim();
        key.starts_with(PUBLIC_KEY_PREFIX)
            .then(|| Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated secret key together with its derived recipient.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

/// Find the secret key in free-form text.
///
/// The whole trimmed text is tried first (the common single-line paste),
/// then each line in order. Returns the first match.
pub fn extract_secret_key(text: &str) -> Option<SecretKey> {
    SecretKey::parse(text).or_else(|| text.lines().find_map(SecretKey::parse))
}

/// Text appended to the key store for one key.
///
/// Always ends with exactly one newline; the blank separator line between
/// blocks is added by the store when appending.
pub struct KeyBlock(Zeroizing<String>);

impl KeyBlock {
    /// Build a block in the same shape `age-keygen` writes.
    pub fn compose(pair: &KeyPair, created: DateTime<Utc>) -> Self {
        let text = format!(
            "# created: {}\n# public key: {}\n{}\n",
            created.format("%Y-%m-%dT%H:%M:%SZ"),
            pair.public,
            pair.secret.expose(),
        );
        Self(Zeroizing::new(text))
    }

    /// Wrap the raw contents of a file written by `age-keygen -o`.
    pub fn from_generated(raw: &str) -> Self {
        Self(Zeroizing::new(format!("{}\n", raw.trim_end())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The secret key carried by this block, if any.
    pub fn secret_key(&self) -> Option<SecretKey> {
        extract_secret_key(&self.0)
    }
}

impl fmt::Debug for KeyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyBlock([REDACTED])")
    }
}
