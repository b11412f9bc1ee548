use crate::rules::{Rule, Strategy};
use regex::{Captures, NoExpand};
use std::borrow::Cow;
use tracing::trace;

/// Text after a rule set ran, plus what fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub text: String,
    pub applied: Vec<String>,
    pub replacements: usize,
}

impl RewriteResult {
    pub fn changed_from(&self, original: &str) -> bool {
        self.text != original
    }
}

/// Runs `rules` in order, each one over the output of the previous.
pub fn apply_rules(rules: &[Rule], text: &str) -> RewriteResult {
    let mut current = text.to_string();
    let mut applied = Vec::new();
    let mut replacements = 0;

    for rule in rules {
        let (rewritten, count) = apply_rule(rule, &current);
        if count == 0 {
            continue;
        }
        trace!(rule = rule.id(), count, "rule fired");
        current = rewritten.into_owned();
        applied.push(rule.id().to_string());
        replacements += count;
    }

    RewriteResult {
        text: current,
        applied,
        replacements,
    }
}

/// Applies one rule and returns the new text with the number of matches it
/// replaced.
///
/// Matches are taken left to right. A bound stops after the first N. Scoped
/// deletions also keep the last remaining match so a legitimate entry
/// survives once its duplicates are gone.
pub fn apply_rule<'t>(rule: &Rule, text: &'t str) -> (Cow<'t, str>, usize) {
    let pattern = rule.pattern();
    let matches = pattern.find_iter(text).count();

    let limit = match rule.strategy() {
        Strategy::ScopedDeletion => rule
            .max_applications()
            .unwrap_or(0)
            .min(matches.saturating_sub(1)),
        _ => rule.max_applications().map_or(matches, |max| max.min(matches)),
    };

    // `replacen` treats 0 as "all", so bail out before reaching it.
    if limit == 0 {
        return (Cow::Borrowed(text), 0);
    }

    let rewritten = match rule.strategy() {
        Strategy::Substitution { replacement } => {
            pattern.replacen(text, limit, replacement.as_str())
        }
        Strategy::Structural { template } => {
            pattern.replacen(text, limit, |caps: &Captures<'_>| template.render(caps))
        }
        Strategy::ScopedDeletion => pattern.replacen(text, limit, NoExpand("")),
    };

    (rewritten, limit)
}
