//! Move a file or directory subtree, falling back to copy + delete.

use crate::fsutil;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// How a successful move was carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Renamed,
    /// `rename` failed (typically across filesystems) and the entry was
    /// copied then removed.
    Copied { rename_error: String },
}

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("cannot read {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copy failed part way. `dst` may hold a partial copy; `src` is intact.
    #[error("failed to copy {src} to {dst} after rename failed ({rename_error}): {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        rename_error: String,
        #[source]
        source: io::Error,
    },

    /// Copy completed but the source could not be removed; both copies exist.
    #[error("copied {src} to {dst} but failed to remove the source: {source}")]
    RemoveSource {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Move `src` to `dst`. Partial copies are left in place on failure.
pub fn move_entry(src: &Path, dst: &Path) -> Result<MoveOutcome, MoveError> {
    move_entry_with(src, dst, |from, to| fs::rename(from, to))
}

pub(crate) fn move_entry_with<F>(src: &Path, dst: &Path, rename: F) -> Result<MoveOutcome, MoveError>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let rename_error = match rename(src, dst) {
        Ok(()) => return Ok(MoveOutcome::Renamed),
        Err(e) => e.to_string(),
    };
    debug!(
        src = %src.display(),
        dst = %dst.display(),
        error = %rename_error,
        "rename failed, falling back to copy"
    );

    let meta = fs::symlink_metadata(src).map_err(|source| MoveError::Stat {
        path: src.to_path_buf(),
        source,
    })?;

    let copied = if meta.is_dir() {
        fsutil::copy_dir_recursive(src, dst)
    } else {
        fsutil::copy_file_preserving(src, dst).map(|_| ())
    };
    copied.map_err(|source| MoveError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        rename_error: rename_error.clone(),
        source,
    })?;

    let removed = if meta.is_dir() {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    };
    removed.map_err(|source| MoveError::RemoveSource {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })?;

    Ok(MoveOutcome::Copied { rename_error })
}
