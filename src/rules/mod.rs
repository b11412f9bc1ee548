pub mod catalog;
pub mod engine;
pub mod field_access;

pub use catalog::RuleCatalog;
pub use engine::{apply_rule, apply_rules, RewriteResult};
pub use field_access::FieldSpec;

use crate::error::{FixError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Substitution,
    Structural,
    ScopedDeletion,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Substitution => "substitution",
            Self::Structural => "structural",
            Self::ScopedDeletion => "scoped-deletion",
        };
        f.write_str(label)
    }
}

/// How a match is turned into output text.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Replacement text with `$1` / `${name}` expansion.
    Substitution { replacement: String },
    /// Captured groups re-emitted verbatim inside a new form.
    Structural { template: Template },
    /// Matches are removed; bounded by `max_applications`.
    ScopedDeletion,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Substitution { .. } => StrategyKind::Substitution,
            Self::Structural { .. } => StrategyKind::Structural,
            Self::ScopedDeletion => StrategyKind::ScopedDeletion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Capture(String),
}

/// Output form of a structural rewrite, e.g. `validate_content({arg})`.
///
/// `{name}` placeholders are filled with the named capture of the same name.
/// Captured text is copied as-is: no `$` expansion and no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(rule_id: &str, source: &str, pattern: &Regex) -> Result<Self> {
        let groups: HashSet<&str> = pattern.capture_names().flatten().collect();
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            if !groups.contains(name) {
                return Err(FixError::invalid_rule(
                    rule_id,
                    format!(
                        "template uses {{{}}} but the pattern has no group named '{}'",
                        name, name
                    ),
                ));
            }
            if whole.start() > last {
                segments.push(Segment::Text(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Capture(name.to_string()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }

        if !segments.iter().any(|s| matches!(s, Segment::Capture(_))) {
            return Err(FixError::invalid_rule(
                rule_id,
                "structural template re-emits no capture; use a substitution instead",
            ));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, caps: &Captures<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Capture(name) => {
                    if let Some(m) = caps.name(name) {
                        out.push_str(m.as_str());
                    }
                }
            }
        }
        out
    }
}

/// A named pattern → replacement transformation.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    description: Option<String>,
    pattern: Regex,
    strategy: Strategy,
    max_applications: Option<NonZeroUsize>,
}

impl Rule {
    pub fn substitution(id: &str, pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        Self::new(
            id,
            pattern,
            Strategy::Substitution {
                replacement: replacement.into(),
            },
        )
    }

    pub fn structural(id: &str, pattern: &str, template: &str) -> Result<Self> {
        let regex = compile(id, pattern)?;
        let template = Template::parse(id, template, &regex)?;
        Self::from_parts(id, regex, Strategy::Structural { template })
    }

    /// Removes matches first to last, at most `max_applications` of them.
    ///
    /// The last match in the text is never removed: with N or fewer matches
    /// only N - 1 go, so the surviving entry keeps the rule idempotent.
    pub fn scoped_deletion(id: &str, pattern: &str, max_applications: usize) -> Result<Self> {
        Self::new(id, pattern, Strategy::ScopedDeletion)?.with_max_applications(max_applications)
    }

    fn new(id: &str, pattern: &str, strategy: Strategy) -> Result<Self> {
        let regex = compile(id, pattern)?;
        Self::from_parts(id, regex, strategy)
    }

    fn from_parts(id: &str, pattern: Regex, strategy: Strategy) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(FixError::configuration("rule id must not be empty"));
        }
        Ok(Self {
            id: id.to_string(),
            description: None,
            pattern,
            strategy,
            max_applications: None,
        })
    }

    pub fn with_max_applications(mut self, max: usize) -> Result<Self> {
        let bound = NonZeroUsize::new(max).ok_or_else(|| {
            FixError::invalid_rule(&self.id, "max_applications must be at least 1")
        })?;
        self.max_applications = Some(bound);
        Ok(self)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn max_applications(&self) -> Option<usize> {
        self.max_applications.map(NonZeroUsize::get)
    }
}

fn compile(id: &str, pattern: &str) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(FixError::invalid_rule(id, "pattern must not be empty"));
    }
    Regex::new(pattern).map_err(|e| FixError::invalid_rule(id, format!("malformed pattern: {}", e)))
}

/// Ordered rules bound to a single file. Frozen once built.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    file: PathBuf,
    rules: Arc<[Rule]>,
}

impl RuleSet {
    pub fn builder(name: impl Into<String>, file: impl Into<PathBuf>) -> RuleSetBuilder {
        RuleSetBuilder {
            name: name.into(),
            file: file.into(),
            rules: Vec::new(),
            fields: None,
        }
    }

    /// Set used for targets the catalog knows nothing about.
    pub fn empty(file: impl Into<PathBuf>) -> Self {
        Self {
            name: "none".to_string(),
            file: file.into(),
            rules: Arc::from(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub struct RuleSetBuilder {
    name: String,
    file: PathBuf,
    rules: Vec<Rule>,
    fields: Option<FieldSpec>,
}

impl RuleSetBuilder {
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn fields(mut self, spec: FieldSpec) -> Self {
        self.fields = Some(spec);
        self
    }

    /// Expands the field spec and freezes the order.
    ///
    /// Field-access rules go right before the first scoped deletion, or last
    /// when the set has none.
    pub fn build(self) -> Result<RuleSet> {
        let mut rules = self.rules;

        if let Some(spec) = &self.fields {
            let expanded = spec.expand()?;
            let at = rules
                .iter()
                .position(|r| r.kind() == StrategyKind::ScopedDeletion)
                .unwrap_or(rules.len());
            rules.splice(at..at, expanded);
        }

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id()) {
                return Err(FixError::configuration(format!(
                    "rule set '{}' ({}) declares rule id '{}' more than once",
                    self.name,
                    self.file.display(),
                    rule.id()
                )));
            }
        }

        Ok(RuleSet {
            name: self.name,
            file: self.file,
            rules: Arc::from(rules),
        })
    }
}
