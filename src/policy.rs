//! Include/exclude admission decisions for files and directories.

use crate::glob::{GlobError, PatternSet};

/// What a source directory holds, as seen from the admission rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirContents {
    /// No files at any depth (it may still contain empty subdirectories).
    Empty,
    /// At least one descendant file exists.
    Files { any_admitted: bool },
}

/// Admission rules built from an include set and an exclude set.
///
/// Includes are OR-ed (an empty include set admits everything). Excludes are
/// consulted only after inclusion passes, and any exclude match vetoes.
#[derive(Debug, Clone, Default)]
pub struct InclusionPolicy {
    includes: PatternSet,
    excludes: PatternSet,
}

impl InclusionPolicy {
    pub fn new(includes: PatternSet, excludes: PatternSet) -> Self {
        Self { includes, excludes }
    }

    /// Compile raw pattern lists into a policy.
    pub fn from_patterns<I, E>(includes: I, excludes: E) -> Result<Self, GlobError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self::new(PatternSet::new(includes)?, PatternSet::new(excludes)?))
    }

    /// Policy that admits every path.
    pub fn admit_all() -> Self {
        Self::default()
    }

    pub fn includes(&self) -> &PatternSet {
        &self.includes
    }

    pub fn excludes(&self) -> &PatternSet {
        &self.excludes
    }

    /// Decide whether a file at `rel_path` (forward-slash, root-relative) is admitted.
    pub fn admit_file(&self, rel_path: &str) -> bool {
        let included = self.includes.is_empty() || self.includes.matches_any(rel_path);
        if !included {
            return false;
        }
        !self.excludes.matches_any(rel_path)
    }

    /// Decide whether a directory should exist in the destination.
    ///
    /// An empty directory must be targeted by the rules itself. A directory
    /// holding files exists only as scaffolding for admitted files, whatever
    /// its own path matches. The mapping root (`""`) is always admitted.
    pub fn admit_dir(&self, rel_path: &str, contents: DirContents) -> bool {
        if rel_path.is_empty() {
            return true;
        }
        match contents {
            DirContents::Empty => self.admit_file(rel_path),
            DirContents::Files { any_admitted } => any_admitted,
        }
    }
}
