//! Structured events emitted by the engine.
//!
//! Every component reports what it did (or, in a dry run, what it would do)
//! through an [`EventSink`]. The engine never formats output itself; see
//! [`crate::console`] for the text and JSON renderers.

use serde::Serialize;
use std::path::PathBuf;

/// Processing phases of one mapping, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Clean,
    Copy,
    Loopback,
    Explode,
    Rename,
    Rewrite,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Clean => "Clean",
            Phase::Copy => "Copy",
            Phase::Loopback => "Loopback copy",
            Phase::Explode => "Exploding",
            Phase::Rename => "Renames",
            Phase::Rewrite => "Rewrites",
        }
    }
}

/// How a move was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMethod {
    Rename,
    CopyDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Rejected by the include/exclude rules.
    Filtered,
    /// Not a regular file (socket, fifo, link to a directory).
    NotRegularFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    MappingStarted {
        source: PathBuf,
        destination: PathBuf,
    },
    MappingCompleted {
        source: PathBuf,
        destination: PathBuf,
    },
    PhaseStarted {
        phase: Phase,
    },
    PhaseCompleted {
        phase: Phase,
    },
    TargetCleaned {
        path: PathBuf,
        removed: usize,
    },
    DirCreated {
        path: PathBuf,
    },
    FileCopied {
        path: String,
        source: PathBuf,
        destination: PathBuf,
    },
    FileSkipped {
        path: String,
        reason: SkipReason,
    },
    LoopbackPatterns {
        patterns: Vec<String>,
    },
    Moved {
        from: PathBuf,
        to: PathBuf,
        method: MoveMethod,
    },
    Exploded {
        dir: String,
        into: PathBuf,
    },
    Renamed {
        from: PathBuf,
        to: PathBuf,
    },
    Rewrote {
        path: PathBuf,
        changed: bool,
    },
    /// Dry-run rename: every entry named `from` under `root`.
    RenamePlanned {
        from: String,
        to: String,
        root: PathBuf,
    },
    RewritePlanned {
        glob: String,
        search: String,
        replace: String,
        regex: bool,
    },
    /// A post-copy target was absent; processing continues.
    NotFound {
        phase: Phase,
        target: String,
        root: PathBuf,
    },
}

/// One reported action. `dry_run` marks intentions that were not carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub dry_run: bool,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            dry_run: false,
            kind,
        }
    }

    pub fn with_dry_run(kind: EventKind, dry_run: bool) -> Self {
        Self { dry_run, kind }
    }
}

/// Receiver for engine events.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: Event) {
        (**self).emit(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: Event) {}
}
