//! Resolution and checks for the executable to drive.

use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};

use crate::error::Violation;

/// Resolve `path` to the canonical executable that will be passed to execve.
///
/// Checks, in order:
/// 1. The path is absolute (no PATH lookup ever happens)
/// 2. It canonicalizes (exists, symlinks resolved)
/// 3. It is a regular file, not a directory or device
/// 4. The current user may execute it
///
/// # Errors
///
/// - `BinNotAbsolute`, `BinNotFound`, `BinCanonicalizeFailed`
/// - `BinIsDirectory`, `BinNotRegularFile`, `BinNotExecutable`
pub fn resolve_binary(path: &Path) -> Result<PathBuf, Violation> {
    let path_str = path.display().to_string();

    if !path.is_absolute() {
        return Err(Violation::BinNotAbsolute { path: path_str });
    }

    let canonical = std::fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Violation::BinNotFound {
            path: path_str.clone(),
        },
        _ => Violation::BinCanonicalizeFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        },
    })?;

    let metadata = std::fs::metadata(&canonical).map_err(|e| Violation::BinCanonicalizeFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    if metadata.is_dir() {
        return Err(Violation::BinIsDirectory { path: path_str });
    }
    if !metadata.is_file() {
        return Err(Violation::BinNotRegularFile { path: path_str });
    }

    // access(2) accounts for supplementary groups and root
    if access(&canonical, AccessFlags::X_OK).is_err() {
        return Err(Violation::BinNotExecutable { path: path_str });
    }

    Ok(canonical)
}
