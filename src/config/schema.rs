use crate::loopback::LoopbackMatch;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Raw run settings as written in a profile file or collected from flags.
///
/// Nothing here is validated; see [`crate::config::Config::from_profile`].
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub source_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub mappings: Vec<DirMapping>,
    pub copy_include: Vec<String>,
    pub copy_exclude: Vec<String>,
    pub explode_dirs: Vec<String>,
    pub renames: Vec<NameMapping>,
    pub rewrites: Vec<RewriteSpec>,
    pub rewrites_are_regex: bool,
    pub clean_target: bool,
    pub loopback_copy: bool,
    pub loopback_match: Option<LoopbackMatch>,
}

impl Profile {
    /// Layer `overrides` on top of `self`.
    ///
    /// Scalars from `overrides` win when set, lists are appended after ours,
    /// flags are OR-ed.
    pub fn merge(mut self, overrides: Profile) -> Profile {
        if overrides.source_dir.is_some() {
            self.source_dir = overrides.source_dir;
        }
        if overrides.target_dir.is_some() {
            self.target_dir = overrides.target_dir;
        }
        if overrides.loopback_match.is_some() {
            self.loopback_match = overrides.loopback_match;
        }
        self.mappings.extend(overrides.mappings);
        self.copy_include.extend(overrides.copy_include);
        self.copy_exclude.extend(overrides.copy_exclude);
        self.explode_dirs.extend(overrides.explode_dirs);
        self.renames.extend(overrides.renames);
        self.rewrites.extend(overrides.rewrites);
        self.rewrites_are_regex |= overrides.rewrites_are_regex;
        self.clean_target |= overrides.clean_target;
        self.loopback_copy |= overrides.loopback_copy;
        self
    }
}

/// Source platform folder to destination platform folder.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DirMapping {
    pub source: String,
    pub destination: String,
}

impl FromStr for DirMapping {
    type Err = ValidationIssue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [source, destination] = split_fields(value, "source:destination")?;
        Ok(Self {
            source,
            destination,
        })
    }
}

/// Exact entry name to rename after copying.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NameMapping {
    pub from: String,
    pub to: String,
}

impl FromStr for NameMapping {
    type Err = ValidationIssue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [from, to] = split_fields(value, "old:new")?;
        Ok(Self { from, to })
    }
}

/// Uncompiled rewrite rule.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RewriteSpec {
    pub glob: String,
    pub search: String,
    #[serde(default)]
    pub replace: String,
}

impl FromStr for RewriteSpec {
    type Err = ValidationIssue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [glob, search, replace] = split_fields(value, "glob:search:replace")?;
        Ok(Self {
            glob,
            search,
            replace,
        })
    }
}

// Exactly N colon-separated fields; a stray colon anywhere is an error.
fn split_fields<const N: usize>(
    value: &str,
    format: &'static str,
) -> Result<[String; N], ValidationIssue> {
    let parts: Vec<String> = value.split(':').map(str::to_string).collect();
    parts
        .try_into()
        .map_err(|_| ValidationIssue::MalformedValue {
            value: value.to_string(),
            format,
        })
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    NoMappings,
    MalformedValue {
        value: String,
        format: &'static str,
    },
    MissingDirectory {
        role: &'static str,
        path: PathBuf,
    },
    InvalidName {
        field: &'static str,
        value: String,
    },
    InvalidGlob {
        field: &'static str,
        message: String,
    },
    InvalidRewrite {
        glob: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => write!(f, "'{field}' is required"),
            ValidationIssue::NoMappings => write!(f, "at least one mapping is required"),
            ValidationIssue::MalformedValue { value, format } => {
                write!(f, "invalid value '{value}': must be in format '{format}'")
            }
            ValidationIssue::MissingDirectory { role, path } => {
                write!(f, "{role} directory does not exist: {}", path.display())
            }
            ValidationIssue::InvalidName { field, value } => {
                write!(f, "invalid {field} '{value}': must be a single non-empty name")
            }
            ValidationIssue::InvalidGlob { field, message } => {
                write!(f, "invalid {field} pattern: {message}")
            }
            ValidationIssue::InvalidRewrite { glob, message } => {
                write!(f, "invalid rewrite for glob '{glob}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}
