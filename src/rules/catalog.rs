use crate::error::{FixError, Result};
use crate::rules::{FieldSpec, Rule, RuleSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("builtin.yaml");

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CatalogDefinition {
    pub rule_sets: Vec<RuleSetDefinition>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuleSetDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub fields: Option<FieldSpecDefinition>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pattern: String,
    /// Treat `pattern` as plain text instead of a regex.
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub replace: Option<String>,
    #[serde(default)]
    pub wrap: Option<String>,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub max_applications: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FieldSpecDefinition {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub accessor: Option<String>,
    pub names: Vec<String>,
}

impl RuleDefinition {
    pub fn to_rule(&self) -> Result<Rule> {
        let pattern = if self.exact {
            regex::escape(&self.pattern)
        } else {
            self.pattern.clone()
        };

        let declared = [self.replace.is_some(), self.wrap.is_some(), self.delete]
            .iter()
            .filter(|set| **set)
            .count();
        if declared != 1 {
            return Err(FixError::invalid_rule(
                &self.id,
                "declare exactly one of `replace`, `wrap` or `delete`",
            ));
        }

        let mut rule = if self.delete {
            let max = self.max_applications.ok_or_else(|| {
                FixError::invalid_rule(&self.id, "`delete` requires max_applications")
            })?;
            Rule::scoped_deletion(&self.id, &pattern, max)?
        } else {
            let rule = match &self.wrap {
                Some(template) => Rule::structural(&self.id, &pattern, template)?,
                None => Rule::substitution(
                    &self.id,
                    &pattern,
                    self.replace.clone().unwrap_or_default(),
                )?,
            };
            match self.max_applications {
                Some(max) => rule.with_max_applications(max)?,
                None => rule,
            }
        };

        if let Some(description) = &self.description {
            rule = rule.with_description(description.clone());
        }
        Ok(rule)
    }
}

impl FieldSpecDefinition {
    pub fn to_spec(&self) -> FieldSpec {
        let mut spec = FieldSpec::new(self.names.iter().cloned());
        if let Some(receiver) = &self.receiver {
            spec = spec.with_receiver(receiver.clone());
        }
        if let Some(accessor) = &self.accessor {
            spec = spec.with_accessor(accessor.clone());
        }
        spec
    }
}

/// Every rule set of a run, keyed by target file, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    sets: Vec<RuleSet>,
    index: HashMap<PathBuf, usize>,
    descriptions: HashMap<String, String>,
}

impl RuleCatalog {
    /// The catalog shipped with the binary.
    pub fn build() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn load_from_yaml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FixError::configuration(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let definition: CatalogDefinition = serde_yaml::from_str(content)
            .map_err(|e| FixError::configuration(format!("invalid rule catalog: {}", e)))?;
        Self::from_definition(&definition)
    }

    pub fn from_definition(definition: &CatalogDefinition) -> Result<Self> {
        let mut catalog = Self::default();

        for set_def in &definition.rule_sets {
            if set_def.files.is_empty() {
                return Err(FixError::configuration(format!(
                    "rule set '{}' does not name any file",
                    set_def.name
                )));
            }

            let rules = set_def
                .rules
                .iter()
                .map(RuleDefinition::to_rule)
                .collect::<Result<Vec<_>>>()?;
            let fields = set_def.fields.as_ref().map(FieldSpecDefinition::to_spec);

            for file in &set_def.files {
                let mut builder = RuleSet::builder(set_def.name.clone(), normalize(file))
                    .rules(rules.iter().cloned());
                if let Some(spec) = &fields {
                    builder = builder.fields(spec.clone());
                }
                catalog.insert(builder.build()?)?;
            }

            if let Some(description) = &set_def.description {
                catalog
                    .descriptions
                    .insert(set_def.name.clone(), description.clone());
            }
        }

        debug!(sets = catalog.sets.len(), "rule catalog built");
        Ok(catalog)
    }

    pub fn from_rule_sets(sets: impl IntoIterator<Item = RuleSet>) -> Result<Self> {
        let mut catalog = Self::default();
        for set in sets {
            catalog.insert(set)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, set: RuleSet) -> Result<()> {
        let key = normalize(set.file());
        if let Some(&existing) = self.index.get(&key) {
            return Err(FixError::configuration(format!(
                "{} is bound to both '{}' and '{}'",
                key.display(),
                self.sets[existing].name(),
                set.name()
            )));
        }
        self.index.insert(key, self.sets.len());
        self.sets.push(set);
        Ok(())
    }

    pub fn get(&self, file: &Path) -> Option<&RuleSet> {
        self.index.get(&normalize(file)).map(|&i| &self.sets[i])
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.sets.iter().map(RuleSet::file)
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.sets
    }

    pub fn description(&self, set_name: &str) -> Option<&str> {
        self.descriptions.get(set_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Drops `.` components so `./src/a.rs` and `src/a.rs` name the same target.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{apply_rules, StrategyKind};

    #[test]
    fn test_builtin_catalog_builds() {
        let catalog = RuleCatalog::build().unwrap();
        assert_eq!(catalog.len(), 9);

        let store = catalog.get(Path::new("src/message_store.rs")).unwrap();
        assert_eq!(store.len(), 7 + 19);
        assert_eq!(store.rules()[7].id(), "field-access:author_id");

        let error = catalog.get(Path::new("./src/error.rs")).unwrap();
        assert_eq!(error.rules()[0].kind(), StrategyKind::ScopedDeletion);
        assert_eq!(error.rules()[0].max_applications(), Some(1));

        let first: Vec<&Path> = catalog.files().take(3).collect();
        assert_eq!(
            first,
            vec![
                Path::new("src/message_store.rs"),
                Path::new("src/message_handler.rs"),
                Path::new("src/error.rs"),
            ]
        );
    }

    #[test]
    fn test_shared_definition_yields_one_set_per_file() {
        let catalog = RuleCatalog::build().unwrap();
        let a = catalog.get(Path::new("src/moderation.rs")).unwrap();
        let b = catalog.get(Path::new("src/websocket.rs")).unwrap();
        assert_eq!(a.name(), "unused-imports");
        assert_eq!(a.len(), b.len());
        assert_eq!(b.file(), Path::new("src/websocket.rs"));
    }

    #[test]
    fn test_builtin_store_rules_fix_sample() {
        let catalog = RuleCatalog::build().unwrap();
        let set = catalog.get(Path::new("src/message_store.rs")).unwrap();
        let input = concat!(
            "    async fn row_to_message(&self, row: sqlx::Row) -> Result<Message> {\n",
            "        if row.is_flagged { return Err(ChatError::PermissionDenied(\"flagged\")); }\n",
            "        let id = row.id;\n",
            "        q.execute(&self.pool).await.map_err(ChatError::Database)?;\n",
        );
        let result = apply_rules(set.rules(), input);
        assert_eq!(
            result.text,
            concat!(
                "    async fn row_to_message<R: sqlx::Row>(&self, row: R) -> Result<Message> {\n",
                "        if row.try_get(\"is_flagged\").unwrap_or_default() { return Err(ChatError::PermissionDenied { message: \"flagged\".to_string() }); }\n",
                "        let id = row.try_get(\"id\").unwrap_or_default();\n",
                "        q.execute(&self.pool).await.map_err(|e| ChatError::database_error(\"database_operation\", e))?;\n",
            )
        );

        let again = apply_rules(set.rules(), &result.text);
        assert_eq!(again.replacements, 0);
    }

    #[test]
    fn test_unused_import_ordering() {
        let catalog = RuleCatalog::build().unwrap();
        let set = catalog.get(Path::new("src/security.rs")).unwrap();
        let input = concat!(
            "use std::collections::HashMap;\n",
            "use std::time::{Duration, SystemTime, UNIX_EPOCH};\n",
            "use serde::{Debug, Serialize, Deserialize};\n",
            "use tracing::{info, error, warn};\n",
            "let mut config = load();\n",
        );
        let result = apply_rules(set.rules(), input);
        assert_eq!(
            result.text,
            concat!(
                "use std::time::{Duration};\n",
                "use serde::{Debug};\n",
                "use tracing::{info, warn};\n",
                "let config = load();\n",
            )
        );
        assert!(!result.applied.contains(&"unused-unix-epoch".to_string()));
        assert!(!result.applied.contains(&"unused-deserialize".to_string()));
    }

    #[test]
    fn test_rule_needs_exactly_one_strategy() {
        let yaml = r#"
rule_sets:
  - name: broken
    files: [src/a.rs]
    rules:
      - id: both
        pattern: 'x'
        replace: 'y'
        delete: true
        max_applications: 1
"#;
        let err = RuleCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_delete_without_bound_is_rejected() {
        let yaml = r#"
rule_sets:
  - name: broken
    files: [src/a.rs]
    rules:
      - id: drop
        pattern: 'x'
        delete: true
"#;
        assert!(RuleCatalog::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_malformed_pattern_fails_the_whole_catalog() {
        let yaml = r#"
rule_sets:
  - name: ok
    files: [src/a.rs]
    rules:
      - id: fine
        pattern: 'a'
        replace: 'b'
  - name: broken
    files: [src/b.rs]
    rules:
      - id: unbalanced
        pattern: 'foo(['
        replace: 'bar'
"#;
        let err = RuleCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_file_bound_twice_is_rejected() {
        let yaml = r#"
rule_sets:
  - name: first
    files: [src/a.rs]
    rules:
      - { id: one, pattern: 'a', replace: 'b' }
  - name: second
    files: [./src/a.rs]
    rules:
      - { id: two, pattern: 'c', replace: 'd' }
"#;
        let err = RuleCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("'first' and 'second'"));
    }

    #[test]
    fn test_exact_patterns_are_escaped() {
        let yaml = r#"
rule_sets:
  - name: exact
    files: [src/a.rs]
    rules:
      - id: call
        exact: true
        pattern: 'foo(1.0)'
        replace: 'bar'
"#;
        let catalog = RuleCatalog::from_yaml_str(yaml).unwrap();
        let set = catalog.get(Path::new("src/a.rs")).unwrap();
        assert_eq!(apply_rules(set.rules(), "foo(1.0) foo(100)").text, "bar foo(100)");
    }
}
