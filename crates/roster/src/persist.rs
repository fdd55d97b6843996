use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{Error, Result};

/// Mode of files created by [`write_atomic`] where none existed before.
///
/// World-readable, since the ensemble process may run as another user.
#[cfg(unix)]
pub const NEW_FILE_MODE: u32 = 0o644;

/// Replaces the contents of `path` without ever exposing a partially
/// written file.
///
/// The new contents go to a temporary file in the same directory, which is
/// synced and then renamed over `path`. If `path` already exists its
/// permissions are carried over to the replacement; otherwise the file gets
/// [`NEW_FILE_MODE`] on unix.
///
/// # Errors
///
/// Returns an error if the directory is not writable or the rename fails.
/// On error the previous contents of `path` are left in place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Io("failed to create temporary file", e))?;

    file.write_all(contents.as_bytes())
        .map_err(|e| Error::Io("failed to write temporary file", e))?;

    let permissions = fs::metadata(path)
        .map(|metadata| metadata.permissions())
        .ok()
        .or_else(new_file_permissions);

    if let Some(permissions) = permissions {
        file.as_file()
            .set_permissions(permissions)
            .map_err(|e| Error::Io("failed to set file permissions", e))?;
    }

    file.as_file()
        .sync_all()
        .map_err(|e| Error::Io("failed to sync temporary file", e))?;

    file.persist(path)
        .map_err(|e| Error::Io("failed to replace file", e.error))?;

    trace!("replaced {}", path.display());

    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
const fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
