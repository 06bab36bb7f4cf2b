//! Secondary include patterns derived from what the first copy brought over.
//!
//! After a filtered copy, the loopback pass re-replicates the same source
//! with these patterns as includes and no excludes, so companion files that
//! share a name with a copied file (artwork, manuals, save files) follow it.

use crate::glob::escape;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopbackMatch {
    /// Same file name at any depth.
    #[default]
    Name,
    /// Same file stem with any extension at any depth.
    Stem,
}

impl LoopbackMatch {
    /// Build sorted, deduplicated patterns from copied relative paths.
    pub fn derive_patterns<I, S>(self, copied: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = BTreeSet::new();
        for rel in copied {
            let rel = rel.as_ref();
            let name = rel.rsplit('/').next().unwrap_or(rel);
            if name.is_empty() {
                continue;
            }
            patterns.insert(self.pattern_for(name));
        }
        patterns.into_iter().collect()
    }

    fn pattern_for(self, name: &str) -> String {
        match self {
            LoopbackMatch::Name => format!("**/{}", escape(name)),
            LoopbackMatch::Stem => match split_stem(name) {
                Some(stem) => format!("**/{}.*", escape(stem)),
                None => format!("**/{}", escape(name)),
            },
        }
    }
}

// Dotfiles (".hidden") and names without an extension have no usable stem.
fn split_stem(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[..idx]),
        _ => None,
    }
}

impl fmt::Display for LoopbackMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopbackMatch::Name => write!(f, "name"),
            LoopbackMatch::Stem => write!(f, "stem"),
        }
    }
}

impl FromStr for LoopbackMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(LoopbackMatch::Name),
            "stem" => Ok(LoopbackMatch::Stem),
            other => Err(format!("unknown loopback match '{other}' (expected name or stem)")),
        }
    }
}
