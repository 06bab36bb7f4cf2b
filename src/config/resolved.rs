use crate::config::schema::{
    DirMapping, NameMapping, Profile, RewriteSpec, ValidationError, ValidationIssue,
};
use crate::loopback::LoopbackMatch;
use crate::policy::InclusionPolicy;
use crate::rewrite::RewriteRule;
use std::path::{Path, PathBuf};

/// Validated, compiled run configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub mappings: Vec<DirMapping>,
    pub policy: InclusionPolicy,
    pub explode_dirs: Vec<String>,
    pub renames: Vec<NameMapping>,
    pub rewrite_specs: Vec<RewriteSpec>,
    pub rewrites: Vec<RewriteRule>,
    pub rewrites_are_regex: bool,
    pub clean_target: bool,
    /// `Some` when the loopback copy is enabled.
    pub loopback: Option<LoopbackMatch>,
    pub dry_run: bool,
}

impl Config {
    /// Validate `profile` and compile its patterns.
    ///
    /// Every problem is collected before returning, so one run reports all
    /// of them.
    pub fn from_profile(profile: Profile) -> Result<Self, ValidationError> {
        let mut issues = Vec::new();

        let source_dir = require(profile.source_dir, "source_dir", &mut issues);
        let target_dir = require(profile.target_dir, "target_dir", &mut issues);

        if let Some(source_dir) = &source_dir {
            if !source_dir.is_dir() {
                issues.push(ValidationIssue::MissingDirectory {
                    role: "source",
                    path: source_dir.clone(),
                });
            } else {
                for mapping in &profile.mappings {
                    let path = join_under(source_dir, &mapping.source);
                    if !path.is_dir() {
                        issues.push(ValidationIssue::MissingDirectory {
                            role: "source mapping",
                            path,
                        });
                    }
                }
            }
        }

        if profile.mappings.is_empty() {
            issues.push(ValidationIssue::NoMappings);
        }

        for name in &profile.explode_dirs {
            check_name("explode directory", name, &mut issues);
        }
        for rename in &profile.renames {
            check_name("rename source", &rename.from, &mut issues);
            check_name("rename target", &rename.to, &mut issues);
        }

        let policy = match InclusionPolicy::from_patterns(
            &profile.copy_include,
            &profile.copy_exclude,
        ) {
            Ok(policy) => Some(policy),
            Err(err) => {
                issues.push(ValidationIssue::InvalidGlob {
                    field: "copy include/exclude",
                    message: err.to_string(),
                });
                None
            }
        };

        let mut rewrites = Vec::with_capacity(profile.rewrites.len());
        for spec in &profile.rewrites {
            match RewriteRule::new(
                &spec.glob,
                &spec.search,
                &spec.replace,
                profile.rewrites_are_regex,
            ) {
                Ok(rule) => rewrites.push(rule),
                Err(err) => issues.push(ValidationIssue::InvalidRewrite {
                    glob: spec.glob.clone(),
                    message: err.to_string(),
                }),
            }
        }

        match (source_dir, target_dir, policy) {
            (Some(source_dir), Some(target_dir), Some(policy)) if issues.is_empty() => Ok(Self {
                source_dir,
                target_dir,
                mappings: profile.mappings,
                policy,
                explode_dirs: profile.explode_dirs,
                renames: profile.renames,
                rewrite_specs: profile.rewrites,
                rewrites,
                rewrites_are_regex: profile.rewrites_are_regex,
                clean_target: profile.clean_target,
                loopback: profile
                    .loopback_copy
                    .then(|| profile.loopback_match.unwrap_or_default()),
                dry_run: false,
            }),
            _ => Err(ValidationError { issues }),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Absolute source folder of `mapping`.
    pub fn source_path(&self, mapping: &DirMapping) -> PathBuf {
        join_under(&self.source_dir, &mapping.source)
    }

    /// Absolute destination folder of `mapping`.
    pub fn dest_path(&self, mapping: &DirMapping) -> PathBuf {
        join_under(&self.target_dir, &mapping.destination)
    }
}

fn require(
    value: Option<PathBuf>,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Some(path),
        _ => {
            issues.push(ValidationIssue::MissingField { field });
            None
        }
    }
}

// A leading separator on the child must not turn it into an absolute path.
fn join_under(root: &Path, child: &str) -> PathBuf {
    root.join(child.trim_start_matches(['/', '\\']))
}

fn check_name(field: &'static str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        issues.push(ValidationIssue::InvalidName {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn profile(root: &Path) -> Profile {
        Profile {
            source_dir: Some(root.join("src")),
            target_dir: Some(root.join("dst")),
            mappings: vec!["snes:SFC".parse().unwrap()],
            ..Profile::default()
        }
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/snes")).unwrap();
        dir
    }

    #[test]
    fn test_minimal_profile_is_valid() {
        let dir = setup();
        let config = Config::from_profile(profile(dir.path())).unwrap();
        assert_eq!(config.mappings.len(), 1);
        assert!(config.loopback.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_mapping_paths_trim_leading_separator() {
        let dir = setup();
        let config = Config::from_profile(profile(dir.path())).unwrap();
        let mapping = DirMapping {
            source: "/snes".to_string(),
            destination: "\\SFC".to_string(),
        };
        assert_eq!(config.source_path(&mapping), dir.path().join("src/snes"));
        assert_eq!(config.dest_path(&mapping), dir.path().join("dst/SFC"));
    }

    #[test]
    fn test_collects_all_issues() {
        let dir = setup();
        let mut p = profile(dir.path());
        p.mappings.push("gba:GBA".parse().unwrap());
        p.copy_include.push("[bad".to_string());
        p.rewrites.push("*.xml:(unclosed:x".parse().unwrap());
        p.rewrites_are_regex = true;
        p.explode_dirs.push("a/b".to_string());

        let err = Config::from_profile(p).unwrap_err();
        assert_eq!(err.issues.len(), 4);
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingDirectory { role: "source mapping", .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InvalidGlob { .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InvalidRewrite { .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InvalidName { .. })));
    }

    #[test]
    fn test_missing_required_fields() {
        let err = Config::from_profile(Profile::default()).unwrap_err();
        assert!(err
            .issues
            .contains(&ValidationIssue::MissingField { field: "source_dir" }));
        assert!(err
            .issues
            .contains(&ValidationIssue::MissingField { field: "target_dir" }));
        assert!(err.issues.contains(&ValidationIssue::NoMappings));
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_profile(profile(dir.path())).unwrap_err();
        assert!(matches!(
            err.issues[0],
            ValidationIssue::MissingDirectory { role: "source", .. }
        ));
    }

    #[test]
    fn test_empty_search_is_rejected() {
        let dir = setup();
        let mut p = profile(dir.path());
        p.rewrites.push("*.xml::x".parse().unwrap());
        assert!(Config::from_profile(p).is_err());
    }

    #[test]
    fn test_loopback_defaults_to_name() {
        let dir = setup();
        let mut p = profile(dir.path());
        p.loopback_copy = true;
        let config = Config::from_profile(p).unwrap();
        assert_eq!(config.loopback, Some(LoopbackMatch::Name));

        let mut p = profile(dir.path());
        p.loopback_match = Some(LoopbackMatch::Stem);
        let config = Config::from_profile(p).unwrap();
        assert_eq!(config.loopback, None);
    }
}
