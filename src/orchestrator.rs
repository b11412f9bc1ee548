use crate::config::RunConfig;
use crate::error::Result;
use crate::rewriter::{FileRewriter, RewriteOutcome, WriteMode};
use crate::rules::catalog::normalize;
use crate::rules::{RuleCatalog, RuleSet};
use crate::verify::{VerificationResult, Verifier};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<RewriteOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
}

impl RunReport {
    pub fn all_files_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    /// Skipped verification counts as passed.
    pub fn verification_passed(&self) -> bool {
        self.verification.as_ref().map_or(true, |v| v.passed)
    }

    pub fn is_clean(&self) -> bool {
        self.all_files_succeeded() && self.verification_passed()
    }

    pub fn files_changed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed()).count()
    }

    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(|o| o.replacements_made).sum()
    }
}

/// Drives a run: rewrite every target, then verify.
pub struct Orchestrator {
    config: RunConfig,
    catalog: Arc<RuleCatalog>,
}

impl Orchestrator {
    /// Builds the catalog up front. A bad catalog stops the run here, before
    /// any file is opened.
    pub fn new(config: RunConfig) -> Result<Self> {
        let catalog = config.catalog.load()?;
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
        })
    }

    pub fn with_catalog(config: RunConfig, catalog: RuleCatalog) -> Self {
        Self {
            config,
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Configured targets, or every catalog file in declaration order.
    pub fn default_targets(&self) -> Vec<PathBuf> {
        if self.config.targets.is_empty() {
            self.catalog.files().map(Path::to_path_buf).collect()
        } else {
            self.config.targets.clone()
        }
    }

    pub fn run(&self, targets: &[PathBuf]) -> RunReport {
        let outcomes = self.rewrite(targets);
        let verification = self.verify();
        RunReport {
            outcomes,
            verification,
        }
    }

    /// One outcome per distinct target, in input order.
    pub fn rewrite(&self, targets: &[PathBuf]) -> Vec<RewriteOutcome> {
        let targets = dedup_targets(targets);
        info!(files = targets.len(), parallel = self.config.parallel, "rewriting");

        if self.config.parallel && targets.len() > 1 {
            self.rewrite_parallel(targets)
        } else {
            self.rewrite_sequential(&targets)
        }
    }

    fn rewrite_sequential(&self, targets: &[PathBuf]) -> Vec<RewriteOutcome> {
        let (base_path, mode) = (&self.config.base_path, self.config.mode);
        targets
            .iter()
            .map(|target| rewrite_one(&self.catalog, base_path, mode, target))
            .collect()
    }

    fn rewrite_parallel(&self, targets: Vec<PathBuf>) -> Vec<RewriteOutcome> {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "no tokio runtime, falling back to sequential rewrite");
                return self.rewrite_sequential(&targets);
            }
        };

        rt.block_on(async {
            let handles: Vec<_> = targets
                .iter()
                .cloned()
                .map(|target| {
                    let catalog = Arc::clone(&self.catalog);
                    let base_path = self.config.base_path.clone();
                    let mode = self.config.mode;
                    tokio::task::spawn_blocking(move || {
                        rewrite_one(&catalog, &base_path, mode, &target)
                    })
                })
                .collect();

            // Awaited in spawn order so the report keeps the input order.
            let mut outcomes = Vec::with_capacity(handles.len());
            for (handle, target) in handles.into_iter().zip(&targets) {
                match handle.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => outcomes.push(RewriteOutcome::aborted(target, e.to_string())),
                }
            }
            outcomes
        })
    }

    /// Runs the check command unless disabled. Dry runs never verify, the
    /// tree on disk did not change.
    pub fn verify(&self) -> Option<VerificationResult> {
        if self.config.mode == WriteMode::DryRun {
            return None;
        }
        let command = self.config.check_command.as_deref()?;
        Some(Verifier::new(command, &self.config.base_path).verify())
    }
}

fn rewrite_one(
    catalog: &RuleCatalog,
    base_path: &Path,
    mode: WriteMode,
    target: &Path,
) -> RewriteOutcome {
    let fallback;
    let rule_set = match catalog.get(target) {
        Some(set) => set,
        None => {
            warn!(file = %target.display(), "no rule set for target");
            fallback = RuleSet::empty(target);
            &fallback
        }
    };
    FileRewriter::new(base_path, mode).apply(target, rule_set)
}

fn dedup_targets(targets: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| {
            let fresh = seen.insert(normalize(t));
            if !fresh {
                warn!(file = %t.display(), "duplicate target ignored");
            }
            fresh
        })
        .cloned()
        .collect()
}
