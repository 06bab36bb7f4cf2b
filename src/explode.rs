//! Flatten a named subdirectory into its parent.

use crate::event::{Event, EventKind, EventSink, MoveMethod};
use crate::mover::{self, MoveError, MoveOutcome};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ExplodeError {
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("cannot explode '{name}': {path} already exists")]
    Conflict { name: String, path: PathBuf },

    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("failed to remove exploded directory {path}: {source}")]
    RemoveDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One child hoisted out of the exploded directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedEntry {
    pub from: PathBuf,
    pub to: PathBuf,
    pub outcome: MoveOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplodeOutcome {
    /// `dest_root/subdir_name` does not exist.
    NotFound,
    Exploded { moved: Vec<MovedEntry> },
}

/// Move every direct child of `dest_root/subdir_name` into `dest_root`, then
/// remove the emptied subdirectory.
///
/// A name collision stops the explosion: children moved before it stay moved
/// and the subdirectory is kept.
pub fn explode(
    dest_root: &Path,
    subdir_name: &str,
    sink: &mut dyn EventSink,
) -> Result<ExplodeOutcome, ExplodeError> {
    let subdir = dest_root.join(subdir_name);
    // Follows links: a symlinked subdirectory is exploded and the link removed.
    let meta = match fs::metadata(&subdir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ExplodeOutcome::NotFound),
        Err(source) => return Err(ExplodeError::Io { path: subdir, source }),
    };
    if !meta.is_dir() {
        return Err(ExplodeError::NotADirectory(subdir));
    }

    let mut children = fs::read_dir(&subdir)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(|source| ExplodeError::Io {
            path: subdir.clone(),
            source,
        })?;
    children.sort_by_key(|entry| entry.file_name());

    let mut moved = Vec::with_capacity(children.len());
    for child in children {
        let name = child.file_name();
        let from = child.path();
        let to = dest_root.join(&name);

        if fs::symlink_metadata(&to).is_ok() {
            return Err(ExplodeError::Conflict {
                name: name.to_string_lossy().into_owned(),
                path: to,
            });
        }

        let outcome = mover::move_entry(&from, &to)?;
        let method = match &outcome {
            MoveOutcome::Renamed => MoveMethod::Rename,
            MoveOutcome::Copied { rename_error } => {
                warn!(from = %from.display(), error = %rename_error, "moved by copy");
                MoveMethod::CopyDelete
            }
        };
        sink.emit(Event::new(EventKind::Moved {
            from: from.clone(),
            to: to.clone(),
            method,
        }));
        moved.push(MovedEntry { from, to, outcome });
    }

    remove_subdir(&subdir).map_err(|source| ExplodeError::RemoveDir {
        path: subdir.clone(),
        source,
    })?;

    sink.emit(Event::new(EventKind::Exploded {
        dir: subdir_name.to_string(),
        into: dest_root.to_path_buf(),
    }));
    Ok(ExplodeOutcome::Exploded { moved })
}

// Non-recursive: a real directory must be empty by now, a link is unlinked.
fn remove_subdir(subdir: &Path) -> io::Result<()> {
    let is_link = fs::symlink_metadata(subdir)?.file_type().is_symlink();
    if is_link {
        fs::remove_file(subdir).or_else(|_| fs::remove_dir(subdir))
    } else {
        fs::remove_dir(subdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_explode_hoists_children() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("psx");
        touch(&root, "multidisk/game.m3u", "m3u");
        touch(&root, "multidisk/disc1/track.bin", "t");
        touch(&root, "images/cover.png", "png");

        let mut events = Vec::new();
        let outcome = explode(&root, "multidisk", &mut events).unwrap();
        explode(&root, "images", &mut events).unwrap();

        match outcome {
            ExplodeOutcome::Exploded { moved } => {
                assert_eq!(moved.len(), 2);
                assert_eq!(moved[0].to, root.join("disc1"));
                assert_eq!(moved[1].to, root.join("game.m3u"));
            }
            other => panic!("expected explosion, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(root.join("game.m3u")).unwrap(), "m3u");
        assert_eq!(fs::read_to_string(root.join("cover.png")).unwrap(), "png");
        assert_eq!(fs::read_to_string(root.join("disc1/track.bin")).unwrap(), "t");
        assert!(!root.join("multidisk").exists());
        assert!(!root.join("images").exists());
        assert!(events
            .iter()
            .any(|e| matches!(e.kind, EventKind::Moved { method: MoveMethod::Rename, .. })));
    }

    #[test]
    fn test_missing_subdir_is_not_found() {
        let dir = TempDir::new().unwrap();
        let outcome = explode(dir.path(), "images", &mut Vec::new()).unwrap();
        assert_eq!(outcome, ExplodeOutcome::NotFound);
    }

    #[test]
    fn test_file_in_place_of_subdir() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "images", "not a dir");
        let err = explode(dir.path(), "images", &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ExplodeError::NotADirectory(_)));
    }

    #[test]
    fn test_conflict_keeps_subdir_and_existing_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "mario.sfc", "existing");
        touch(root, "sub/mario.sfc", "incoming");

        let err = explode(root, "sub", &mut Vec::new()).unwrap_err();
        match err {
            ExplodeError::Conflict { name, .. } => assert_eq!(name, "mario.sfc"),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(root.join("sub").is_dir());
        assert_eq!(fs::read_to_string(root.join("mario.sfc")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("sub/mario.sfc")).unwrap(), "incoming");
    }

    #[test]
    fn test_conflict_after_partial_moves() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "b.bin", "existing");
        touch(root, "sub/a.bin", "a");
        touch(root, "sub/b.bin", "b");

        assert!(explode(root, "sub", &mut Vec::new()).is_err());
        assert_eq!(fs::read_to_string(root.join("a.bin")).unwrap(), "a");
        assert!(root.join("sub/b.bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_subdir_is_followed() {
        let dir = TempDir::new().unwrap();
        let library = dir.path().join("library/images");
        touch(&library, "cover.png", "png");
        let root = dir.path().join("psx");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&library, root.join("images")).unwrap();

        let outcome = explode(&root, "images", &mut Vec::new()).unwrap();

        assert!(matches!(outcome, ExplodeOutcome::Exploded { ref moved } if moved.len() == 1));
        assert_eq!(fs::read_to_string(root.join("cover.png")).unwrap(), "png");
        assert!(fs::symlink_metadata(root.join("images")).is_err());
        assert!(library.is_dir());
        assert_eq!(fs::read_dir(&library).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_subdir_is_removed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let outcome = explode(dir.path(), "empty", &mut Vec::new()).unwrap();
        assert_eq!(outcome, ExplodeOutcome::Exploded { moved: vec![] });
        assert!(!dir.path().join("empty").exists());
    }
}
