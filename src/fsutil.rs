//! Filesystem primitives shared by the engine components.

use filetime::FileTime;
use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;

/// Copy one file's bytes and permission bits, replacing `dst` if it exists.
///
/// Symlinks are followed, so a link to a file is copied by content.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::copy(src, dst)
}

/// Like [`copy_file`], and also carry over the modification time.
pub fn copy_file_preserving(src: &Path, dst: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    filetime::set_file_mtime(dst, FileTime::from_last_modification_time(&meta))?;
    Ok(bytes)
}

/// Create `path` and any missing ancestors. On unix the leaf gets `perms`'
/// mode (subject to the process umask); existing directories are left alone.
pub fn create_dir_with_mode(path: &Path, perms: &Permissions) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        fs::DirBuilder::new()
            .recursive(true)
            .mode(perms.mode() & 0o7777)
            .create(path)
    }
    #[cfg(not(unix))]
    {
        let _ = perms;
        fs::create_dir_all(path)
    }
}

/// Recursively copy the tree at `src` to `dst`.
///
/// Directories keep their mode, files keep mode and mtime, symlinks are
/// recreated as links on unix. `dst` must not exist yet.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let meta = entry.metadata().map_err(io::Error::from)?;
            create_dir_with_mode(&target, &meta.permissions())?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file_preserving(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    copy_file_preserving(src, dst).map(|_| ())
}

/// Remove everything directly under `path`, keeping `path` itself.
///
/// Returns how many top-level entries were removed. A missing directory is
/// treated as already clean.
pub fn clear_directory(path: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let entry_path = entry.path();
        if fs::symlink_metadata(&entry_path)?.is_dir() {
            fs::remove_dir_all(&entry_path)?;
        } else {
            fs::remove_file(&entry_path)?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The temp file lives next to `path` so the final rename never crosses a
/// filesystem. Permission bits of an existing `path` are kept.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory")
    })?;

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(perms) = existing {
        temp.as_file().set_permissions(perms)?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
