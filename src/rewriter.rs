use crate::error::FixError;
use crate::files;
use crate::rules::{apply_rules, RuleSet};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Rewritten,
    Unchanged,
    /// Dry run: changes computed, file left alone.
    Planned,
    NotFound,
    ReadFailed,
    WriteFailed,
    /// The worker handling the file died.
    Aborted,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Rewritten => "rewritten",
            Self::Unchanged => "unchanged",
            Self::Planned => "planned",
            Self::NotFound => "not found",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// What happened to one target file.
#[derive(Serialize, Debug, Clone)]
pub struct RewriteOutcome {
    pub file_path: PathBuf,
    pub rules_applied: Vec<String>,
    pub replacements_made: usize,
    pub success: bool,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RewriteOutcome {
    fn ok(
        file_path: &Path,
        status: OutcomeStatus,
        rules_applied: Vec<String>,
        replacements_made: usize,
    ) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            rules_applied,
            replacements_made,
            success: true,
            status,
            error: None,
        }
    }

    pub fn failed(file_path: &Path, error: &FixError) -> Self {
        let status = match error {
            FixError::FileNotFound { .. } => OutcomeStatus::NotFound,
            FixError::WriteFailure { .. } => OutcomeStatus::WriteFailed,
            _ => OutcomeStatus::ReadFailed,
        };
        Self {
            file_path: file_path.to_path_buf(),
            rules_applied: Vec::new(),
            replacements_made: 0,
            success: false,
            status,
            error: Some(error.to_string()),
        }
    }

    pub fn aborted(file_path: &Path, reason: impl Into<String>) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            rules_applied: Vec::new(),
            replacements_made: 0,
            success: false,
            status: OutcomeStatus::Aborted,
            error: Some(reason.into()),
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Rewritten | OutcomeStatus::Planned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    InPlace,
    DryRun,
}

/// Applies one rule set to one file. Built per file and thrown away.
pub struct FileRewriter<'a> {
    base_path: &'a Path,
    mode: WriteMode,
}

impl<'a> FileRewriter<'a> {
    pub fn new(base_path: &'a Path, mode: WriteMode) -> Self {
        Self { base_path, mode }
    }

    /// `target` is resolved against the base path; the outcome reports it as
    /// given.
    pub fn apply(&self, target: &Path, rule_set: &RuleSet) -> RewriteOutcome {
        let path = self.base_path.join(target);

        let original = match files::read_source(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %target.display(), error = %e, "skipping file");
                return RewriteOutcome::failed(target, &e);
            }
        };

        let result = apply_rules(rule_set.rules(), &original);
        debug!(
            file = %target.display(),
            rules = result.applied.len(),
            replacements = result.replacements,
            "rule set applied"
        );

        let status = if !result.changed_from(&original) {
            OutcomeStatus::Unchanged
        } else if self.mode == WriteMode::DryRun {
            OutcomeStatus::Planned
        } else {
            OutcomeStatus::Rewritten
        };
        if status != OutcomeStatus::Rewritten {
            return RewriteOutcome::ok(target, status, result.applied, result.replacements);
        }

        match files::write_atomic(&path, &result.text) {
            Ok(()) => RewriteOutcome::ok(target, status, result.applied, result.replacements),
            Err(e) => {
                warn!(file = %target.display(), error = %e, "write failed");
                RewriteOutcome {
                    rules_applied: result.applied,
                    replacements_made: result.replacements,
                    ..RewriteOutcome::failed(target, &e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use std::fs;
    use tempfile::TempDir;

    fn rule_set(file: &str) -> RuleSet {
        RuleSet::builder("test", file)
            .rule(Rule::substitution("fallible", r"\.unwrap\(\)", "?").unwrap())
            .rule(Rule::scoped_deletion("dup-line", r"(?m)^dup\n", 1).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_rewrites_and_counts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.rs"), "a.unwrap();\nb.unwrap();\ndup\ndup\n").unwrap();

        let outcome = FileRewriter::new(tmp.path(), WriteMode::InPlace)
            .apply(Path::new("a.rs"), &rule_set("a.rs"));

        assert!(outcome.success);
        assert_eq!(outcome.status, OutcomeStatus::Rewritten);
        assert_eq!(outcome.replacements_made, 3);
        assert_eq!(outcome.rules_applied, vec!["fallible".to_string(), "dup-line".to_string()]);
        assert_eq!(outcome.file_path, PathBuf::from("a.rs"));
        assert_eq!(fs::read_to_string(tmp.path().join("a.rs")).unwrap(), "a?;\nb?;\ndup\n");
    }

    #[test]
    fn test_correct_file_is_not_touched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.rs");
        fs::write(&path, "a?;\ndup\n").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let outcome = FileRewriter::new(tmp.path(), WriteMode::InPlace)
            .apply(Path::new("a.rs"), &rule_set("a.rs"));

        assert!(outcome.success);
        assert_eq!(outcome.status, OutcomeStatus::Unchanged);
        assert_eq!(outcome.replacements_made, 0);
        assert!(outcome.rules_applied.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a?;\ndup\n");
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.rs");
        fs::write(&path, "x.unwrap();\n").unwrap();

        let outcome = FileRewriter::new(tmp.path(), WriteMode::DryRun)
            .apply(Path::new("a.rs"), &rule_set("a.rs"));

        assert_eq!(outcome.status, OutcomeStatus::Planned);
        assert_eq!(outcome.replacements_made, 1);
        assert!(outcome.changed());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x.unwrap();\n");
    }

    #[test]
    fn test_missing_file_outcome() {
        let tmp = TempDir::new().unwrap();
        let outcome = FileRewriter::new(tmp.path(), WriteMode::InPlace)
            .apply(Path::new("ghost.rs"), &rule_set("ghost.rs"));

        assert!(!outcome.success);
        assert_eq!(outcome.status, OutcomeStatus::NotFound);
        assert!(outcome.error.as_deref().unwrap_or("").contains("ghost.rs"));
        assert!(!tmp.path().join("ghost.rs").exists());
    }

    // procfs files can be read but nothing can be created next to them, even
    // as root, so staging the new content fails after the rules ran.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_keeps_applied_rules() {
        let set = RuleSet::builder("proc", "comm")
            .rule(Rule::substitution("header", r"\A", "// ").unwrap())
            .build()
            .unwrap();
        let before = fs::read_to_string("/proc/self/comm").unwrap();

        let outcome = FileRewriter::new(Path::new("/proc/self"), WriteMode::InPlace)
            .apply(Path::new("comm"), &set);

        assert!(!outcome.success);
        assert_eq!(outcome.status, OutcomeStatus::WriteFailed);
        assert_eq!(outcome.rules_applied, vec!["header".to_string()]);
        assert_eq!(outcome.replacements_made, 1);
        assert!(outcome.error.as_deref().unwrap_or("").starts_with("failed to write"));
        assert_eq!(fs::read_to_string("/proc/self/comm").unwrap(), before);
    }
}
