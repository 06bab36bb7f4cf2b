//! Doublestar glob matching over forward-slash relative paths.
//!
//! Patterns are compiled with `globset` so that `*` and `?` never cross a
//! `/`, `**` spans zero or more whole segments, and `\` escapes the next
//! character. Paths are always matched in their forward-slash form relative
//! to a mapping root, never as absolute or native-separator paths.

use globset::{GlobBuilder, GlobMatcher};
use std::borrow::Cow;
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlobError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A compiled doublestar glob.
///
/// A pattern ending in `/**` names the directory itself as well as
/// everything below it, so `saves/**` matches `saves` too.
#[derive(Debug, Clone)]
pub struct Matcher {
    direct: GlobMatcher,
    itself: Option<GlobMatcher>,
}

impl Matcher {
    pub fn is_match(&self, rel_path: &str) -> bool {
        self.direct.is_match(rel_path)
            || self.itself.as_ref().is_some_and(|m| m.is_match(rel_path))
    }
}

/// Compile one doublestar glob.
pub fn compile(pattern: &str) -> Result<Matcher, GlobError> {
    let normalized = normalize_pattern(pattern);
    let direct = build(pattern, &normalized)?;
    let itself = match normalized.strip_suffix("/**") {
        Some(prefix) if !prefix.is_empty() && !prefix.ends_with('\\') => {
            Some(build(pattern, prefix)?)
        }
        _ => None,
    };
    Ok(Matcher { direct, itself })
}

fn build(pattern: &str, glob: &str) -> Result<GlobMatcher, GlobError> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| GlobError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

// Windows users type native separators; everywhere else `\` is an escape.
fn normalize_pattern(pattern: &str) -> Cow<'_, str> {
    if cfg!(windows) {
        Cow::Owned(pattern.replace('\\', "/"))
    } else {
        Cow::Borrowed(pattern)
    }
}

/// Escape glob metacharacters so `name` matches only itself.
pub fn escape(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for ch in name.chars() {
        if matches!(ch, '\\' | '*' | '?' | '[' | ']' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// An ordered set of compiled globs that keeps the user's pattern text.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<String>,
    matchers: Vec<Matcher>,
}

impl PatternSet {
    /// Compile every pattern, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self, GlobError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = PatternSet::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            set.matchers.push(compile(pattern)?);
            set.patterns.push(pattern.to_string());
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Pattern text in the order it was given.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if `rel_path` matches at least one pattern. An empty set matches nothing.
    pub fn matches_any(&self, rel_path: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(rel_path))
    }
}

/// Render a relative path with `/` separators, dropping `.` components.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            Component::ParentDir => Cow::Borrowed(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => continue,
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&part);
    }
    out
}

/// `path` relative to `root` in forward-slash form, or `None` if it lies outside.
pub fn relative_slash(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(to_slash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn set(patterns: &[&str]) -> PatternSet {
        PatternSet::new(patterns).unwrap()
    }

    #[test]
    fn test_single_star_stays_in_one_segment() {
        let s = set(&["*.png"]);
        assert!(s.matches_any("cover.png"));
        assert!(!s.matches_any("images/cover.png"));
    }

    #[test]
    fn test_double_star_matches_zero_or_more_segments() {
        let s = set(&["**/*.png"]);
        assert!(s.matches_any("cover.png"));
        assert!(s.matches_any("images/cover.png"));
        assert!(s.matches_any("a/b/c/cover.png"));
        assert!(!s.matches_any("images/cover.jpg"));
    }

    #[test]
    fn test_trailing_double_star_matches_dir_itself() {
        let s = set(&["empty/**"]);
        assert!(s.matches_any("empty"));
        assert!(s.matches_any("empty/inner"));
        assert!(!s.matches_any("empty2"));
        assert!(!s.matches_any("sub/empty"));

        let s = set(&["**/nested/**"]);
        assert!(s.matches_any("nested"));
        assert!(s.matches_any("a/nested"));
        assert!(s.matches_any("nested/empty_nested"));
        assert!(!s.matches_any("nested2"));
    }

    #[test]
    fn test_question_mark_and_class() {
        let s = set(&["disk?.bin", "file[0-9].txt"]);
        assert!(s.matches_any("disk1.bin"));
        assert!(!s.matches_any("disk10.bin"));
        assert!(s.matches_any("file7.txt"));
        assert!(!s.matches_any("filea.txt"));
    }

    #[test]
    fn test_alternation() {
        let s = set(&["*.{sfc,smc}"]);
        assert!(s.matches_any("mario.sfc"));
        assert!(s.matches_any("luigi.smc"));
        assert!(!s.matches_any("peach.nes"));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let s = PatternSet::default();
        assert!(s.is_empty());
        assert!(!s.matches_any("anything"));
    }

    #[test]
    fn test_invalid_pattern_reports_text() {
        let err = PatternSet::new(["ok/*", "[unclosed"]).unwrap_err();
        match err {
            GlobError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[unclosed"),
        }
    }

    #[test]
    fn test_patterns_keep_order() {
        let s = set(&["b", "a"]);
        assert_eq!(s.patterns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_escape_matches_literal_name() {
        let name = "Super Game (USA) [!].sfc";
        let s = PatternSet::new([format!("**/{}", escape(name))]).unwrap();
        assert!(s.matches_any("Super Game (USA) [!].sfc"));
        assert!(s.matches_any("sub/Super Game (USA) [!].sfc"));
        assert!(!s.matches_any("Super Game (USA) !.sfc"));
    }

    #[test]
    fn test_to_slash() {
        let path: PathBuf = ["psx", "multidisk", "game.m3u"].iter().collect();
        assert_eq!(to_slash(&path), "psx/multidisk/game.m3u");
        assert_eq!(to_slash(Path::new("./a/./b")), "a/b");
        assert_eq!(to_slash(Path::new("")), "");
    }

    #[test]
    fn test_relative_slash() {
        let root = Path::new("/roms/snes");
        assert_eq!(
            relative_slash(root, &root.join("images").join("a.png")).as_deref(),
            Some("images/a.png")
        );
        assert_eq!(relative_slash(root, root).as_deref(), Some(""));
        assert_eq!(relative_slash(root, Path::new("/other")), None);
    }
}
