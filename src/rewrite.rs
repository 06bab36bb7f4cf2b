//! Find/replace inside files selected by a glob.

use crate::event::{Event, EventKind, EventSink};
use crate::fsutil;
use crate::glob::{self, GlobError};
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Literal,
    Regex,
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rewrite search term must not be empty")]
    EmptySearch,

    #[error("failed to scan {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A compiled rewrite: which files, what to find, what to put instead.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    glob: String,
    search: String,
    replace: String,
    kind: SearchKind,
    matcher: glob::Matcher,
    regex: Regex,
}

impl RewriteRule {
    pub fn new(glob: &str, search: &str, replace: &str, is_regex: bool) -> Result<Self, RewriteError> {
        if search.is_empty() {
            return Err(RewriteError::EmptySearch);
        }
        let matcher = glob::compile(root_relative(glob))?;
        let (kind, source) = if is_regex {
            (SearchKind::Regex, Cow::Borrowed(search))
        } else {
            (SearchKind::Literal, Cow::Owned(regex::escape(search)))
        };
        let regex = Regex::new(&source).map_err(|source| RewriteError::InvalidRegex {
            pattern: search.to_string(),
            source,
        })?;

        Ok(Self {
            glob: glob.to_string(),
            search: search.to_string(),
            replace: replace.to_string(),
            kind,
            matcher,
            regex,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn replace(&self) -> &str {
        &self.replace
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    /// Replace every non-overlapping match in `content`.
    pub fn apply<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        match self.kind {
            SearchKind::Literal => self
                .regex
                .replace_all(content, NoExpand(self.replace.as_bytes())),
            SearchKind::Regex => self.regex.replace_all(content, self.replace.as_bytes()),
        }
    }

    fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

// Globs are matched against paths relative to the destination folder, so
// `./*.m3u` and `/*.m3u` both mean `*.m3u`.
fn root_relative(mut glob: &str) -> &str {
    loop {
        if let Some(rest) = glob.strip_prefix("./") {
            glob = rest;
        } else if let Some(rest) = glob.strip_prefix('/') {
            glob = rest;
        } else {
            return glob;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The glob matched no regular file.
    NotFound,
    Rewritten { files: Vec<PathBuf> },
}

/// Regular files under `dest_root` whose relative path matches the rule's glob.
pub fn expand(dest_root: &Path, rule: &RewriteRule) -> Result<Vec<PathBuf>, RewriteError> {
    if !dest_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dest_root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| RewriteError::Walk {
            root: dest_root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = glob::relative_slash(dest_root, entry.path()) else {
            continue;
        };
        if rule.matches(&rel) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Apply `rule` to every matching file under `dest_root`.
///
/// The first failure stops the run; files already rewritten stay rewritten.
pub fn rewrite(
    dest_root: &Path,
    rule: &RewriteRule,
    sink: &mut dyn EventSink,
) -> Result<RewriteOutcome, RewriteError> {
    let files = expand(dest_root, rule)?;
    if files.is_empty() {
        return Ok(RewriteOutcome::NotFound);
    }

    for path in &files {
        let content = fs::read(path).map_err(|source| RewriteError::Read {
            path: path.clone(),
            source,
        })?;
        let changed = match rule.apply(&content) {
            Cow::Borrowed(_) => false,
            Cow::Owned(updated) => {
                fsutil::atomic_write(path, &updated).map_err(|source| RewriteError::Write {
                    path: path.clone(),
                    source,
                })?;
                true
            }
        };
        if !changed {
            debug!(file = %path.display(), search = %rule.search, "no match, left unchanged");
        }
        sink.emit(Event::new(EventKind::Rewrote {
            path: path.clone(),
            changed,
        }));
    }

    Ok(RewriteOutcome::Rewritten { files })
}
