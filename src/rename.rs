//! Exact-name renames anywhere under a destination tree.

use crate::event::{Event, EventKind, EventSink};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("failed to scan {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid rename target name '{0}'")]
    InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    NotFound,
    Renamed { paths: Vec<PathBuf> },
}

/// Rename every entry named `old_name` below `dest_root` to `new_name`.
///
/// Matches are handled deepest first so renaming a directory never
/// invalidates a pending match inside it. An existing file at the target is
/// replaced.
pub fn rename_all(
    dest_root: &Path,
    old_name: &str,
    new_name: &str,
    sink: &mut dyn EventSink,
) -> Result<RenameOutcome, RenameError> {
    if new_name.is_empty() || new_name.contains(['/', '\\']) {
        return Err(RenameError::InvalidName(new_name.to_string()));
    }
    if !dest_root.is_dir() {
        return Ok(RenameOutcome::NotFound);
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(dest_root)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| RenameError::Walk {
            root: dest_root.to_path_buf(),
            source,
        })?;
        if entry.file_name() == old_name {
            matches.push(entry.into_path());
        }
    }

    if matches.is_empty() {
        return Ok(RenameOutcome::NotFound);
    }

    let mut paths = Vec::with_capacity(matches.len());
    for from in matches {
        let to = from.with_file_name(new_name);
        fs::rename(&from, &to).map_err(|source| RenameError::Rename {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        sink.emit(Event::new(EventKind::Renamed {
            from,
            to: to.clone(),
        }));
        paths.push(to);
    }
    Ok(RenameOutcome::Renamed { paths })
}
