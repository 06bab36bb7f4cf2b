//! ROM Copy Engine: selective platform-folder replication for game libraries.
//!
//! A run copies one or more source platform folders into a destination tree,
//! filtered by include/exclude globs, and then reshapes the result: named
//! subdirectories are flattened into their parent ("exploded"), entries are
//! renamed by exact name, and file contents are rewritten with literal or
//! regex find/replace.
//!
//! # Architecture
//!
//! The copy is two-pass. [`replicate::plan`] walks the source and records
//! which directories belong in the destination; [`replicate::replicate`]
//! then executes purely from that record. Every component reports through an
//! [`EventSink`] and never prints; [`console`] renders events as text or
//! JSON lines.
//!
//! # Example
//!
//! ```no_run
//! use rom_copy_engine::config::{Config, Profile};
//! use rom_copy_engine::engine;
//!
//! let profile = Profile {
//!     source_dir: Some("/home/me/ROMs".into()),
//!     target_dir: Some("/media/sdcard/Roms".into()),
//!     mappings: vec!["snes:SFC".parse().unwrap()],
//!     explode_dirs: vec!["images".to_string()],
//!     ..Profile::default()
//! };
//! let config = Config::from_profile(profile).unwrap();
//!
//! let mut events = Vec::new();
//! let summary = engine::run(&config, &mut events).unwrap();
//! println!("copied {} files", summary.total_copied());
//! ```

pub mod config;
pub mod console;
pub mod engine;
pub mod event;
pub mod explode;
pub mod fsutil;
pub mod glob;
pub mod loopback;
pub mod mover;
pub mod policy;
pub mod rename;
pub mod replicate;
pub mod rewrite;

// Re-exports
pub use config::{Config, ConfigError, Profile, ValidationError, ValidationIssue};
pub use engine::{run, EngineError, MappingSummary, RunSummary};
pub use event::{Event, EventKind, EventSink, NullSink};
pub use explode::{explode, ExplodeError, ExplodeOutcome};
pub use glob::{GlobError, PatternSet};
pub use loopback::LoopbackMatch;
pub use mover::{move_entry, MoveError, MoveOutcome};
pub use policy::{DirContents, InclusionPolicy};
pub use rename::{rename_all, RenameError, RenameOutcome};
pub use replicate::{replicate, AdmissionRecord, ReplicateError, ReplicateReport};
pub use rewrite::{rewrite, RewriteError, RewriteOutcome, RewriteRule};
