//! Orchestration of one run: every mapping, every phase, in order.
//!
//! For each mapping the phases are clean, copy, loopback, explode, rename and
//! rewrite. Post-copy phases act on the whole destination folder, not only on
//! what this run copied. The first error aborts the run and leaves the
//! destination as it is.

use crate::config::{Config, DirMapping};
use crate::event::{Event, EventKind, EventSink, Phase};
use crate::explode::{self, ExplodeError, ExplodeOutcome};
use crate::fsutil;
use crate::glob::GlobError;
use crate::policy::InclusionPolicy;
use crate::rename::{self, RenameError, RenameOutcome};
use crate::replicate::{self, ReplicateError};
use crate::rewrite::{self, RewriteError, RewriteOutcome};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info_span};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("error cleaning target directory {path}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error copying files: {0}")]
    Replicate(#[from] ReplicateError),

    #[error("error building loopback patterns: {0}")]
    Loopback(#[from] GlobError),

    #[error("error exploding directory: {0}")]
    Explode(#[from] ExplodeError),

    #[error("error renaming item: {0}")]
    Rename(#[from] RenameError),

    #[error("error rewriting '{search}' to '{replace}' for glob '{glob}': {source}")]
    Rewrite {
        glob: String,
        search: String,
        replace: String,
        #[source]
        source: RewriteError,
    },
}

/// Counts for one processed mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub cleaned: usize,
    pub copied: usize,
    pub skipped: usize,
    pub loopback_copied: usize,
    pub exploded: usize,
    pub renamed: usize,
    pub rewritten: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub mappings: Vec<MappingSummary>,
}

impl RunSummary {
    pub fn total_copied(&self) -> usize {
        self.mappings
            .iter()
            .map(|m| m.copied + m.loopback_copied)
            .sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.mappings.iter().map(|m| m.skipped).sum()
    }
}

/// Process every configured mapping in order.
pub fn run(config: &Config, sink: &mut dyn EventSink) -> Result<RunSummary, EngineError> {
    let mut summary = RunSummary::default();
    for mapping in &config.mappings {
        summary.mappings.push(process_mapping(config, mapping, sink)?);
    }
    Ok(summary)
}

struct PhaseScope<'a> {
    sink: &'a mut dyn EventSink,
    dry_run: bool,
}

impl PhaseScope<'_> {
    fn emit(&mut self, kind: EventKind) {
        self.sink.emit(Event::with_dry_run(kind, self.dry_run));
    }

    fn start(&mut self, phase: Phase) {
        self.emit(EventKind::PhaseStarted { phase });
    }

    fn complete(&mut self, phase: Phase) {
        self.emit(EventKind::PhaseCompleted { phase });
    }
}

/// Run all phases for one mapping.
pub fn process_mapping(
    config: &Config,
    mapping: &DirMapping,
    sink: &mut dyn EventSink,
) -> Result<MappingSummary, EngineError> {
    let source = config.source_path(mapping);
    let dest = config.dest_path(mapping);
    let dry_run = config.dry_run;
    let _span = info_span!(
        "mapping",
        source = %mapping.source,
        destination = %mapping.destination
    )
    .entered();

    let mut scope = PhaseScope { sink, dry_run };
    let mut summary = MappingSummary {
        source: source.clone(),
        destination: dest.clone(),
        ..MappingSummary::default()
    };

    scope.emit(EventKind::MappingStarted {
        source: source.clone(),
        destination: dest.clone(),
    });

    if config.clean_target {
        scope.start(Phase::Clean);
        let removed = if dry_run {
            0
        } else {
            fsutil::clear_directory(&dest).map_err(|source| EngineError::Clean {
                path: dest.clone(),
                source,
            })?
        };
        summary.cleaned = removed;
        scope.emit(EventKind::TargetCleaned {
            path: dest.clone(),
            removed,
        });
        scope.complete(Phase::Clean);
    }

    scope.start(Phase::Copy);
    let report = replicate::replicate(&source, &dest, &config.policy, dry_run, scope.sink)?;
    summary.copied = report.copied.len();
    summary.skipped = report.skipped;
    scope.complete(Phase::Copy);

    if let Some(matching) = config.loopback {
        scope.start(Phase::Loopback);
        if !report.copied.is_empty() {
            let patterns = matching.derive_patterns(&report.copied);
            scope.emit(EventKind::LoopbackPatterns {
                patterns: patterns.clone(),
            });
            let policy = InclusionPolicy::from_patterns(&patterns, std::iter::empty::<&str>())?;
            let loopback = replicate::replicate(&source, &dest, &policy, dry_run, scope.sink)?;
            let first_pass: HashSet<&str> = report.copied.iter().map(String::as_str).collect();
            summary.loopback_copied = loopback
                .copied
                .iter()
                .filter(|rel| !first_pass.contains(rel.as_str()))
                .count();
        }
        scope.complete(Phase::Loopback);
    }

    if !config.explode_dirs.is_empty() {
        scope.start(Phase::Explode);
        for name in &config.explode_dirs {
            summary.exploded += explode_one(&mut scope, &dest, name)?;
        }
        scope.complete(Phase::Explode);
    }

    if !config.renames.is_empty() {
        scope.start(Phase::Rename);
        for rename in &config.renames {
            if dry_run {
                scope.emit(EventKind::RenamePlanned {
                    from: rename.from.clone(),
                    to: rename.to.clone(),
                    root: dest.clone(),
                });
                continue;
            }
            match rename::rename_all(&dest, &rename.from, &rename.to, scope.sink)? {
                RenameOutcome::NotFound => scope.emit(EventKind::NotFound {
                    phase: Phase::Rename,
                    target: rename.from.clone(),
                    root: dest.clone(),
                }),
                RenameOutcome::Renamed { paths } => summary.renamed += paths.len(),
            }
        }
        scope.complete(Phase::Rename);
    }

    if !config.rewrites.is_empty() {
        scope.start(Phase::Rewrite);
        for rule in &config.rewrites {
            if dry_run {
                scope.emit(EventKind::RewritePlanned {
                    glob: rule.glob().to_string(),
                    search: rule.search().to_string(),
                    replace: rule.replace().to_string(),
                    regex: config.rewrites_are_regex,
                });
                continue;
            }
            let outcome = rewrite::rewrite(&dest, rule, scope.sink).map_err(|source| {
                EngineError::Rewrite {
                    glob: rule.glob().to_string(),
                    search: rule.search().to_string(),
                    replace: rule.replace().to_string(),
                    source,
                }
            })?;
            match outcome {
                RewriteOutcome::NotFound => scope.emit(EventKind::NotFound {
                    phase: Phase::Rewrite,
                    target: rule.glob().to_string(),
                    root: dest.clone(),
                }),
                RewriteOutcome::Rewritten { files } => summary.rewritten += files.len(),
            }
        }
        scope.complete(Phase::Rewrite);
    }

    scope.emit(EventKind::MappingCompleted {
        source,
        destination: dest,
    });
    debug!(?summary, "mapping complete");
    Ok(summary)
}

fn explode_one(scope: &mut PhaseScope<'_>, dest: &Path, name: &str) -> Result<usize, EngineError> {
    if scope.dry_run {
        scope.emit(EventKind::Exploded {
            dir: name.to_string(),
            into: dest.to_path_buf(),
        });
        return Ok(0);
    }
    match explode::explode(dest, name, scope.sink)? {
        ExplodeOutcome::NotFound => {
            scope.emit(EventKind::NotFound {
                phase: Phase::Explode,
                target: name.to_string(),
                root: dest.to_path_buf(),
            });
            Ok(0)
        }
        ExplodeOutcome::Exploded { .. } => Ok(1),
    }
}
