//! Two-pass selective tree copy.
//!
//! Pass 1 ([`plan`]) walks the source once and decides, for every directory,
//! whether it belongs in the destination. The result is a flat
//! [`AdmissionRecord`]. Pass 2 walks again and executes purely from that
//! record plus the per-file admission rule, so a directory's fate never
//! depends on the order in which its descendants are visited.

use crate::event::{Event, EventKind, EventSink, SkipReason};
use crate::fsutil;
use crate::glob::to_slash;
use crate::policy::{DirContents, InclusionPolicy};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Destination directory path to the permission bits of its source directory.
///
/// Contains exactly the admitted directories below the mapping root.
pub type AdmissionRecord = BTreeMap<PathBuf, Permissions>;

#[derive(Error, Debug)]
pub enum ReplicateError {
    #[error("source {0} is not a directory")]
    SourceNotDirectory(PathBuf),

    #[error("failed to read source tree under {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What a replicate pass did (or would do, in a dry run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicateReport {
    /// Relative forward-slash paths of copied files, in walk order.
    pub copied: Vec<String>,
    pub skipped: usize,
    pub dirs_created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
    Other,
}

// Directories are taken as-is; anything else counts as a file only if it
// resolves (through links) to a regular file.
fn classify(entry: &DirEntry) -> EntryKind {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => EntryKind::File,
            _ => EntryKind::Other,
        }
    } else {
        EntryKind::Other
    }
}

fn walk(root: &Path) -> impl Iterator<Item = Result<DirEntry, ReplicateError>> + '_ {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(move |entry| {
            entry.map_err(|source| ReplicateError::Walk {
                root: root.to_path_buf(),
                source,
            })
        })
}

fn rel_of<'a>(root: &Path, entry: &'a DirEntry) -> &'a Path {
    entry.path().strip_prefix(root).unwrap_or(entry.path())
}

#[derive(Debug, Default, Clone, Copy)]
struct DirStats {
    has_file: bool,
    any_admitted: bool,
}

/// Pass 1: compute the set of destination directories to create.
pub fn plan(
    source_root: &Path,
    dest_root: &Path,
    policy: &InclusionPolicy,
) -> Result<AdmissionRecord, ReplicateError> {
    let mut dirs: Vec<(PathBuf, String, Permissions)> = Vec::new();
    let mut stats: HashMap<String, DirStats> = HashMap::new();

    for entry in walk(source_root) {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let rel = rel_of(source_root, &entry);
        let rel_slash = to_slash(rel);

        match classify(&entry) {
            EntryKind::Dir => {
                let perms = entry
                    .metadata()
                    .map_err(|source| ReplicateError::Walk {
                        root: source_root.to_path_buf(),
                        source,
                    })?
                    .permissions();
                dirs.push((rel.to_path_buf(), rel_slash, perms));
            }
            EntryKind::File => {
                let admitted = policy.admit_file(&rel_slash);
                for (idx, _) in rel_slash.match_indices('/') {
                    let ancestor = stats.entry(rel_slash[..idx].to_string()).or_default();
                    ancestor.has_file = true;
                    ancestor.any_admitted |= admitted;
                }
            }
            EntryKind::Other => {}
        }
    }

    let mut record = AdmissionRecord::new();
    for (rel, rel_slash, perms) in dirs {
        let contents = match stats.get(&rel_slash) {
            Some(s) if s.has_file => DirContents::Files {
                any_admitted: s.any_admitted,
            },
            _ => DirContents::Empty,
        };
        if policy.admit_dir(&rel_slash, contents) {
            record.insert(dest_root.join(rel), perms);
        } else {
            debug!(dir = %rel_slash, "directory not admitted");
        }
    }

    debug!(
        source = %source_root.display(),
        admitted = record.len(),
        "planned directory admissions"
    );
    Ok(record)
}

/// Copy the admitted part of `source_root` into `dest_root`.
///
/// Existing destination files are overwritten; nothing is ever removed. With
/// `dry_run` set every decision is still reported but the filesystem is left
/// untouched.
pub fn replicate(
    source_root: &Path,
    dest_root: &Path,
    policy: &InclusionPolicy,
    dry_run: bool,
    sink: &mut dyn EventSink,
) -> Result<ReplicateReport, ReplicateError> {
    match fs::metadata(source_root) {
        Ok(meta) if meta.is_dir() => {}
        _ => return Err(ReplicateError::SourceNotDirectory(source_root.to_path_buf())),
    }

    let record = plan(source_root, dest_root, policy)?;
    let mut report = ReplicateReport::default();

    if !dest_root.is_dir() {
        if !dry_run {
            fs::create_dir_all(dest_root).map_err(|source| ReplicateError::CreateDir {
                path: dest_root.to_path_buf(),
                source,
            })?;
        }
        report.dirs_created += 1;
        sink.emit(Event::with_dry_run(
            EventKind::DirCreated {
                path: dest_root.to_path_buf(),
            },
            dry_run,
        ));
    }

    for entry in walk(source_root) {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let rel = rel_of(source_root, &entry);
        let rel_slash = to_slash(rel);
        let dest = dest_root.join(rel);

        match classify(&entry) {
            EntryKind::Dir => {
                let Some(perms) = record.get(&dest) else {
                    continue;
                };
                if dest.is_dir() {
                    continue;
                }
                if !dry_run {
                    fsutil::create_dir_with_mode(&dest, perms).map_err(|source| {
                        ReplicateError::CreateDir {
                            path: dest.clone(),
                            source,
                        }
                    })?;
                }
                report.dirs_created += 1;
                sink.emit(Event::with_dry_run(
                    EventKind::DirCreated { path: dest },
                    dry_run,
                ));
            }
            EntryKind::File => {
                if !policy.admit_file(&rel_slash) {
                    report.skipped += 1;
                    sink.emit(Event::with_dry_run(
                        EventKind::FileSkipped {
                            path: rel_slash,
                            reason: SkipReason::Filtered,
                        },
                        dry_run,
                    ));
                    continue;
                }
                if !dry_run {
                    ensure_parent(&dest, &record)?;
                    fsutil::copy_file(entry.path(), &dest).map_err(|source| {
                        ReplicateError::Copy {
                            from: entry.path().to_path_buf(),
                            to: dest.clone(),
                            source,
                        }
                    })?;
                }
                sink.emit(Event::with_dry_run(
                    EventKind::FileCopied {
                        path: rel_slash.clone(),
                        source: entry.path().to_path_buf(),
                        destination: dest,
                    },
                    dry_run,
                ));
                report.copied.push(rel_slash);
            }
            EntryKind::Other => {
                report.skipped += 1;
                sink.emit(Event::with_dry_run(
                    EventKind::FileSkipped {
                        path: rel_slash,
                        reason: SkipReason::NotRegularFile,
                    },
                    dry_run,
                ));
            }
        }
    }

    Ok(report)
}

// Pre-order walking has normally created the parent already; this covers a
// parent that was removed between the two passes.
fn ensure_parent(dest: &Path, record: &AdmissionRecord) -> Result<(), ReplicateError> {
    let Some(parent) = dest.parent() else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }
    let created = match record.get(parent) {
        Some(perms) => fsutil::create_dir_with_mode(parent, perms),
        None => fs::create_dir_all(parent),
    };
    created.map_err(|source| ReplicateError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })
}
