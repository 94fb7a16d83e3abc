//! Atomic file replacement with permission hardening.
//!
//! Writes go to a named temporary file in the destination directory, are
//! flushed and synced, then renamed over the target (atomic on the same
//! filesystem). The temporary file is removed on every failure path by
//! `tempfile`'s drop guard.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `data`, then set its mode to `mode`.
///
/// Parent directories are created as needed. Setting the final mode is
/// best effort: failures are logged and ignored. On non-Unix targets
/// `mode` is ignored.
pub fn atomic_write(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(parent);

    set_mode_best_effort(path, mode);
    tracing::debug!(path = %path.display(), bytes = data.len(), "atomic write complete");
    Ok(())
}

/// Tighten the permissions of an existing directory, ignoring failures.
///
/// Missing directories are skipped.
pub fn tighten_dir(dir: &Path, mode: u32) {
    if dir.is_dir() {
        set_mode_best_effort(dir, mode);
    }
}

#[cfg(unix)]
fn set_mode_best_effort(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        tracing::debug!(path = %path.display(), error = %e, "could not set permissions");
    }
}

#[cfg(not(unix))]
fn set_mode_best_effort(_path: &Path, _mode: u32) {}

/// Persist the rename itself. Not every filesystem supports syncing a directory.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
