//! Turns a list of field names into defensive accessor rules.
//!
//! `row.status` becomes `row.try_get("status").unwrap_or_default()`, one
//! substitution rule per field. Names are expanded in lexicographic order so the
//! resulting rule order never depends on how the list was written.

use crate::error::{FixError, Result};
use crate::rules::Rule;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

pub const DEFAULT_ACCESSOR: &str = r#"{receiver}.try_get("{field}").unwrap_or_default()"#;

const ANY_IDENTIFIER: &str = "[A-Za-z_][A-Za-z0-9_]*";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    receiver: Option<String>,
    accessor: String,
    names: BTreeSet<String>,
}

impl FieldSpec {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            receiver: None,
            accessor: DEFAULT_ACCESSOR.to_string(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Restricts matches to one receiver identifier (e.g. `row`).
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Accessor template using `{receiver}` and `{field}`.
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    pub fn expand(&self) -> Result<Vec<Rule>> {
        if !self.accessor.contains("{receiver}") {
            return Err(FixError::configuration(format!(
                "field accessor '{}' must contain {{receiver}}",
                self.accessor
            )));
        }

        let receiver = match &self.receiver {
            Some(r) => {
                ensure_identifier("receiver", r)?;
                regex::escape(r)
            }
            None => ANY_IDENTIFIER.to_string(),
        };

        // `$` in the template is literal text; only `{receiver}` expands.
        let escaped = self.accessor.replace('$', "$$");

        self.names
            .iter()
            .map(|field| {
                ensure_identifier("field", field)?;
                let pattern = format!(r"\b(?P<receiver>{})\.{}\b", receiver, regex::escape(field));
                let replacement = escaped
                    .replace("{receiver}", "${receiver}")
                    .replace("{field}", field);
                Ok(Rule::substitution(&format!("field-access:{}", field), &pattern, replacement)?
                    .with_description(format!("defensive read of .{}", field)))
            })
            .collect()
    }
}

fn ensure_identifier(what: &str, value: &str) -> Result<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(FixError::configuration(format!(
            "{} name '{}' is not a plain identifier",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::apply_rules;

    #[test]
    fn test_expands_one_rule_per_field_in_lexicographic_order() {
        let rules = FieldSpec::new(["status", "id"]).expand().unwrap();
        let ids: Vec<&str> = rules.iter().map(Rule::id).collect();
        assert_eq!(ids, vec!["field-access:id", "field-access:status"]);
        assert!(rules[0].pattern().is_match("result.id"));
        assert!(rules[1].pattern().is_match("result.status"));
    }

    #[test]
    fn test_rewrites_direct_access_only() {
        let rules = FieldSpec::new(["id", "status"]).expand().unwrap();
        let result = apply_rules(&rules, "let a = result.id;\nlet b = result.other_field;\n");
        assert_eq!(
            result.text,
            "let a = result.try_get(\"id\").unwrap_or_default();\nlet b = result.other_field;\n"
        );
        assert_eq!(result.replacements, 1);
        assert_eq!(result.applied, vec!["field-access:id".to_string()]);
    }

    #[test]
    fn test_longer_names_sharing_a_prefix_are_untouched() {
        let rules = FieldSpec::new(["id"]).expand().unwrap();
        let result = apply_rules(&rules, "user.identity + user.id_hash");
        assert_eq!(result.replacements, 0);
    }

    #[test]
    fn test_fixed_receiver() {
        let rules = FieldSpec::new(["content"]).with_receiver("row").expand().unwrap();
        let result = apply_rules(&rules, "row.content; msg.content");
        assert_eq!(
            result.text,
            "row.try_get(\"content\").unwrap_or_default(); msg.content"
        );
    }

    #[test]
    fn test_rewritten_text_is_stable() {
        let rules = FieldSpec::new(["id", "status"]).expand().unwrap();
        let once = apply_rules(&rules, "if row.status == 1 { row.id }");
        let twice = apply_rules(&rules, &once.text);
        assert_eq!(twice.replacements, 0);
        assert_eq!(twice.text, once.text);
    }

    #[test]
    fn test_custom_accessor() {
        let rules = FieldSpec::new(["name"])
            .with_accessor("{receiver}.get(\"{field}\").cloned().unwrap_or_default()")
            .expand()
            .unwrap();
        let result = apply_rules(&rules, "cfg.name");
        assert_eq!(result.text, "cfg.get(\"name\").cloned().unwrap_or_default()");
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        assert!(FieldSpec::new(["not a field"]).expand().is_err());
        assert!(FieldSpec::new(["id"]).with_receiver("a.b").expand().is_err());
        assert!(FieldSpec::new(["id"]).with_accessor("get({field})").expand().is_err());
    }
}
