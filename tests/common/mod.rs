//! Shared fixtures: a throwaway sandbox with a fake `age-keygen`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sops_init::env::Env;

/// Stand-in for `age-keygen`. The recipient is the lowercased secret with
/// the prefix swapped, so derivation is deterministic and checkable.
/// Secrets containing `BROKEN` make `-y` fail like a malformed key would;
/// secrets containing `NOPREFIX` make it print something that is not a
/// recipient.
pub const FAKE_KEYGEN: &str = r#"#!/bin/sh
case "$1" in
  -o)
    key="AGE-SECRET-KEY-1FAKE$(date +%s)$$"
    pub=$(printf '%s' "$key" | sed 's/^AGE-SECRET-KEY-/age1/' | tr 'A-Z' 'a-z')
    printf '# created: 2024-01-01T00:00:00Z\n# public key: %s\n%s\n' "$pub" "$key" > "$2"
    echo "Public key: $pub" >&2
    ;;
  -y)
    line=$(grep '^AGE-SECRET-KEY-' "$2")
    case "$line" in
      *BROKEN*) echo "malformed secret key" >&2; exit 1 ;;
      *NOPREFIX*) echo "garbage"; exit 0 ;;
    esac
    printf '%s\n' "$line" | sed 's/^AGE-SECRET-KEY-/age1/' | tr 'A-Z' 'a-z'
    ;;
  *)
    echo "usage: age-keygen [-o OUTPUT] [-y INPUT]" >&2
    exit 2
    ;;
esac
"#;

/// Recipient the fake utility derives for `secret`.
pub fn fake_recipient(secret: &str) -> String {
    secret.replacen("AGE-SECRET-KEY-", "age1", 1).to_lowercase()
}

/// Temp layout: `bin/` (fake utility), `config/` (XDG base), `work/` (cwd).
pub struct Sandbox {
    root: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("bin")).unwrap();
        std::fs::create_dir(root.path().join("work")).unwrap();

        let sandbox = Self { root };
        sandbox.install_keygen(FAKE_KEYGEN);
        sandbox
    }

    /// Replace the fake utility with a custom script body.
    pub fn install_keygen(&self, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = self.bin_dir().join("age-keygen");
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn keys_path(&self) -> PathBuf {
        self.config_dir().join("sops").join("age").join("keys.txt")
    }

    pub fn sops_config(&self) -> PathBuf {
        self.work_dir().join(".sops.yaml")
    }

    /// Environment with the fake utility on `PATH`.
    pub fn env(&self) -> Env {
        Env::mock([
            ("PATH", self.bin_dir().display().to_string()),
            ("XDG_CONFIG_HOME", self.config_dir().display().to_string()),
        ])
    }

    /// Environment where no key utility can be found.
    pub fn env_without_keygen(&self) -> Env {
        let empty = self.root.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        Env::mock([
            ("PATH", empty.display().to_string()),
            ("XDG_CONFIG_HOME", self.config_dir().display().to_string()),
        ])
    }
}

/// Secret key lines in the store, in order.
pub fn secret_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|l| l.starts_with("AGE-SECRET-KEY-"))
        .collect()
}

/// Recipients named in `# public key:` comments, in order.
pub fn public_key_comments(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter_map(|l| l.strip_prefix("# public key: "))
        .collect()
}

/// Whether anything exists at `path`.
pub fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}
