//! `age-keygen` CLI wrapper.
//!
//! Shells out to the external utility via `std::process::Command` for the
//! two operations this tool needs: generating a key file (`-o <path>`) and
//! deriving the recipient from a key file (`-y <path>`). All key material
//! handed to the utility goes through owner-only temporary files that are
//! removed when the operation returns.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use thiserror::Error;

use crate::constants::{ENV_PATH, KEYGEN_BIN};
use crate::env::Env;
use crate::keys::{KeyBlock, KeyPair, PublicKey, SecretKey};

/// Errors from invoking the key utility.
#[derive(Error, Debug)]
pub enum KeygenError {
    #[error(
        "'{program}' is required but was not found on PATH. \
         Install age (https://github.com/FiloSottile/age) and ensure '{bin}' is available.",
        bin = KEYGEN_BIN
    )]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{command} failed with exit code {exit}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        exit: String,
        stderr: String,
    },

    #[error(
        "failed to derive a valid age public key (exit code {exit}){}",
        stderr_suffix(.stderr)
    )]
    InvalidPublicKey { exit: String, stderr: String },

    #[error("generated key file does not contain an age secret key")]
    NoSecretKey,

    #[error("temporary key file error: {0}")]
    TempFile(#[source] io::Error),
}

/// A freshly generated key: the block to store and the validated pair.
#[derive(Debug)]
pub struct GeneratedKey {
    pub block: KeyBlock,
    pub pair: KeyPair,
}

/// Handle to a located `age-keygen` executable.
#[derive(Debug, Clone)]
pub struct Keygen {
    program: PathBuf,
}

impl Keygen {
    /// Resolve `name` to an executable.
    ///
    /// A name containing a path separator must point at an executable file.
    /// A bare name is searched for on the `PATH` seen by `env`.
    pub fn locate(name: &str, env: &Env) -> Result<Self, KeygenError> {
        let candidate = Path::new(name);
        let program = if candidate.components().count() > 1 {
            is_executable(candidate).then(|| candidate.to_path_buf())
        } else {
            env.var(ENV_PATH)
                .ok()
                .and_then(|path| find_on_path(name, &path))
        };

        match program {
            Some(program) => {
                tracing::debug!(program = %program.display(), "located key utility");
                Ok(Self { program })
            }
            None => Err(KeygenError::NotFound {
                program: name.to_string(),
            }),
        }
    }

    /// Use an explicit executable path without lookup.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Generate a new key pair in a private temporary directory.
    ///
    /// The directory and the key file inside it are removed before
    /// returning, on success and on error.
    pub fn generate(&self) -> Result<GeneratedKey, KeygenError> {
        let dir = tempfile::tempdir().map_err(KeygenError::TempFile)?;
        // `-o` refuses to overwrite, so point it at a path that does not exist yet.
        let key_path = dir.path().join("age-key.txt");

        self.run(&[OsStr::new("-o"), key_path.as_os_str()])?;
        let raw = std::fs::read_to_string(&key_path).map_err(KeygenError::TempFile)?;
        let public = self.derive_public_key(&key_path)?;

        let block = KeyBlock::from_generated(&raw);
        let secret = block.secret_key().ok_or(KeygenError::NoSecretKey)?;

        Ok(GeneratedKey {
            block,
            pair: KeyPair { secret, public },
        })
    }

    /// Run `age-keygen -y <key_file>` and validate the printed recipient.
    pub fn derive_public_key(&self, key_file: &Path) -> Result<PublicKey, KeygenError> {
        let output = self.run(&[OsStr::new("-y"), key_file.as_os_str()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        PublicKey::parse(&stdout).ok_or_else(|| KeygenError::InvalidPublicKey {
            exit: exit_code(&output),
            stderr: one_line(&output.stderr),
        })
    }

    /// Derive the recipient for a secret key supplied by the operator.
    ///
    /// The secret is written to an owner-only temporary file that is
    /// deleted when this function returns; a failed delete is ignored.
    pub fn derive_from_secret(&self, secret: &SecretKey) -> Result<PublicKey, KeygenError> {
        let mut tmp = tempfile::NamedTempFile::new().map_err(KeygenError::TempFile)?;
        writeln!(tmp, "{}", secret.expose()).map_err(KeygenError::TempFile)?;
        tmp.flush().map_err(KeygenError::TempFile)?;

        self.derive_public_key(tmp.path())
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output, KeygenError> {
        let command = self.command_line(args);
        tracing::debug!(%command, "running key utility");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| KeygenError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(KeygenError::Failed {
                command,
                exit: exit_code(&output),
                stderr: one_line(&output.stderr),
            });
        }

        Ok(output)
    }

    /// `age-keygen -y` style label for diagnostics (no file paths).
    fn command_line(&self, args: &[&OsStr]) -> String {
        let name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| KEYGEN_BIN.to_string());
        match args.first() {
            Some(flag) => format!("{name} {}", flag.to_string_lossy()),
            None => name,
        }
    }
}

fn exit_code(output: &Output) -> String {
    match output.status.code() {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Collapse utility stderr into a single diagnostic line.
fn one_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// `": <stderr>"`, or nothing when the utility printed nothing.
fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

fn find_on_path(name: &str, path_var: &str) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            let plain = dir.join(name);
            let with_suffix = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
            [plain, with_suffix]
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Stand-in for `age-keygen`: the recipient is the lowercased secret
    /// with the prefix swapped, so derivation is deterministic. Every file
    /// argument is logged to `calls.log` next to the script.
    const FAKE_KEYGEN: &str = r#"#!/bin/sh
case "$1" in
  -o)
    echo "$2" >> "$(dirname "$0")/calls.log"
    key="AGE-SECRET-KEY-1FAKE$(date +%s)$$"
    pub=$(printf '%s' "$key" | sed 's/^AGE-SECRET-KEY-/age1/' | tr 'A-Z' 'a-z')
    printf '# created: 2024-01-01T00:00:00Z\n# public key: %s\n%s\n' "$pub" "$key" > "$2"
    echo "Public key: $pub" >&2
    ;;
  -y)
    echo "$2" >> "$(dirname "$0")/calls.log"
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

    fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn locate_finds_program_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = install_script(dir.path(), "age-keygen", FAKE_KEYGEN);
        let env = Env::mock([("PATH", format!("/nonexistent:{}", dir.path().display()))]);

        let keygen = Keygen::locate("age-keygen", &env).unwrap();
        assert_eq!(keygen.program(), script);
    }

    #[test]
    fn locate_reports_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let env = Env::mock([("PATH", dir.path().display().to_string())]);
        let err = Keygen::locate("age-keygen", &env).unwrap_err();
        assert!(matches!(err, KeygenError::NotFound { .. }));
        assert!(err.to_string().contains("not found on PATH"), "got: {err}");
    }

    #[test]
    fn locate_without_path_var_is_missing() {
        let env = Env::mock(Vec::<(&str, &str)>::new());
        assert!(matches!(
            Keygen::locate("age-keygen", &env),
            Err(KeygenError::NotFound { .. })
        ));
    }

    #[test]
    fn locate_skips_non_executable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("age-keygen"), "not executable").unwrap();
        let env = Env::mock([("PATH", dir.path().display().to_string())]);
        assert!(Keygen::locate("age-keygen", &env).is_err());
    }

    #[test]
    fn locate_accepts_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = install_script(dir.path(), "my-keygen", FAKE_KEYGEN);
        let env = Env::mock(Vec::<(&str, &str)>::new());
        let keygen = Keygen::locate(&script.display().to_string(), &env).unwrap();
        assert_eq!(keygen.program(), script);
    }

    #[test]
    fn generate_yields_matching_pair() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));

        let generated = keygen.generate().unwrap();
        let secret = generated.pair.secret.expose();
        assert!(secret.starts_with("AGE-SECRET-KEY-1FAKE"));
        assert!(generated.pair.public.as_str().starts_with("age1"));
        assert!(generated.block.as_str().ends_with(&format!("{secret}\n")));

        // Independent derivation agrees with the generated recipient.
        let derived = keygen.derive_from_secret(&generated.pair.secret).unwrap();
        assert_eq!(derived, generated.pair.public);
    }

    #[test]
    fn derive_from_secret_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));
        let log = dir.path().join("calls.log");

        let secret = SecretKey::parse("AGE-SECRET-KEY-1TEMPCHECK").unwrap();
        let public = keygen.derive_from_secret(&secret).unwrap();
        assert_eq!(public.as_str(), "age11tempcheck");

        let broken = SecretKey::parse("AGE-SECRET-KEY-1BROKEN").unwrap();
        assert!(keygen.derive_from_secret(&broken).is_err());

        let logged = std::fs::read_to_string(&log).unwrap();
        let paths: Vec<_> = logged.lines().collect();
        assert_eq!(paths.len(), 2);
        for path in paths {
            assert!(!Path::new(path).exists(), "temp file left behind: {path}");
        }
    }

    #[test]
    fn utility_failure_carries_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));
        let secret = SecretKey::parse("AGE-SECRET-KEY-1BROKEN").unwrap();

        let err = keygen.derive_from_secret(&secret).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("age-keygen -y failed with exit code 1"), "got: {msg}");
        assert!(msg.contains("malformed secret key"), "got: {msg}");
        assert!(!msg.contains('\n'));
    }

    #[test]
    fn wrong_prefix_is_a_derivation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));
        let secret = SecretKey::parse("AGE-SECRET-KEY-1NOPREFIX").unwrap();
        assert!(matches!(
            keygen.derive_from_secret(&secret),
            Err(KeygenError::InvalidPublicKey { .. })
        ));
    }

    #[test]
    fn failing_generator_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let script = install_script(
            dir.path(),
            "age-keygen",
            "#!/bin/sh\necho 'entropy unavailable' >&2\nexit 4\n",
        );
        let err = Keygen::with_program(script).generate().unwrap_err();
        assert!(matches!(err, KeygenError::Failed { ref exit, .. } if exit == "4"));
        assert!(err.to_string().contains("entropy unavailable"));
    }

    #[test]
    fn empty_stderr_leaves_no_dangling_separator() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));
        let secret = SecretKey::parse("AGE-SECRET-KEY-1NOPREFIX").unwrap();

        let err = keygen.derive_from_secret(&secret).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to derive a valid age public key (exit code 0)"
        );

        let silent = install_script(dir.path(), "silent-keygen", "#!/bin/sh\nexit 5\n");
        let err = Keygen::with_program(silent).generate().unwrap_err();
        assert_eq!(err.to_string(), "silent-keygen -o failed with exit code 5");
    }

    /// Key files handed to the utility, in call order.
    fn logged_paths(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap()
            .lines()
            .map(PathBuf::from)
            .collect()
    }

    #[test]
    fn generate_removes_temp_dir_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", FAKE_KEYGEN));
        keygen.generate().unwrap();

        let paths = logged_paths(dir.path());
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], paths[1]);
        assert!(!paths[0].exists(), "key file left behind");
        assert!(!paths[0].parent().unwrap().exists(), "temp dir left behind");
    }

    #[test]
    fn generate_removes_temp_dir_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"#!/bin/sh
echo "$2" >> "$(dirname "$0")/calls.log"
case "$1" in
  -o) printf '# created: 2024-01-01T00:00:00Z\n' > "$2" ;;
  -y) echo "age1nosecret" ;;
esac
"#;
        let keygen = Keygen::with_program(install_script(dir.path(), "age-keygen", script));
        let err = keygen.generate().unwrap_err();
        assert!(matches!(err, KeygenError::NoSecretKey), "got: {err}");

        let paths = logged_paths(dir.path());
        assert!(!paths.is_empty());
        for path in paths {
            assert!(!path.exists(), "key file left behind: {}", path.display());
            assert!(!path.parent().unwrap().exists(), "temp dir left behind");
        }
    }
}
