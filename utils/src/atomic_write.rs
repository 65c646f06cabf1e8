//! Atomic file writes.
//!
//! Bytes land in a temp file in the destination directory, then get renamed
//! over the target. Where rename-over-existing fails, the old file is moved
//! aside to `.bak` first and restored if the second rename also fails.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Inherit the process umask.
    Default,
    /// 0o600 on Unix. Used for anything holding an API key.
    #[default]
    OwnerOnly,
}

/// Write `bytes` to `path` atomically with owner-only permissions.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write_with_mode(path, bytes, PersistMode::OwnerOnly)
}

pub fn atomic_write_with_mode(
    path: impl AsRef<Path>,
    bytes: &[u8],
    mode: PersistMode,
) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    apply_mode(tmp.path(), mode)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup = path.with_extension("bak");
        let _ = fs::remove_file(&backup);
        fs::rename(path, &backup)?;
        if let Err(retry) = err.file.persist(path) {
            let _ = fs::rename(&backup, path);
            return Err(retry.error);
        }
        if let Err(e) = fs::remove_file(&backup) {
            tracing::warn!(path = %backup.display(), "Failed to remove .bak after atomic write: {e}");
        }
    }

    apply_mode(path, mode)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: PersistMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        PersistMode::Default => Ok(()),
        PersistMode::OwnerOnly => fs::set_permissions(path, fs::Permissions::from_mode(0o600)),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: PersistMode) -> io::Result<()> {
    Ok(())
}
