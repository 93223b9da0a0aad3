//! Output writing.
//!
//! The finished document is written to a temporary file in the destination
//! directory and renamed over the target, so readers see either the old file
//! or the complete new one.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{EmitError, Result};

/// What [`write_atomic`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or replaced.
    Written,
    /// The file already had identical contents and was left alone.
    Unchanged,
}

/// Atomically replace `path` with `contents`.
///
/// Missing parent directories are created. The replacement keeps the
/// permissions of the file it replaces.
pub fn write_atomic(path: &Path, contents: &str) -> Result<WriteOutcome> {
    let err = |source: std::io::Error| EmitError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Ok(existing) = fs::read(path) {
        if existing == contents.as_bytes() {
            tracing::debug!(path = %path.display(), "output unchanged");
            return Ok(WriteOutcome::Unchanged);
        }
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
    tmp.write_all(contents.as_bytes()).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;

    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(err)?;
    }

    tmp.persist(path).map_err(|e| err(e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(WriteOutcome::Written)
}

/// Temporary files are created owner-only; generated sources should not be.
#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}
