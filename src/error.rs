use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building the catalog or rewriting files.
///
/// Only `Configuration` is fatal to a run. The file-level variants end up in a
/// `RewriteOutcome` and processing moves on to the next target.
#[derive(Error, Debug)]
pub enum FixError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("verification failed: `{command}` {reason}")]
    VerificationFailure { command: String, reason: String },
}

impl FixError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Error raised for a single rule inside a rule set.
    pub fn invalid_rule(rule_id: &str, message: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("rule '{}': {}", rule_id, message))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, FixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_errors_are_fatal() {
        assert!(FixError::configuration("bad").is_fatal());
        assert!(!FixError::FileNotFound { path: PathBuf::from("a.rs") }.is_fatal());
        assert!(!FixError::WriteFailure {
            path: PathBuf::from("a.rs"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        }
        .is_fatal());
    }

    #[test]
    fn test_invalid_rule_message_names_the_rule() {
        let err = FixError::invalid_rule("dup-arm", "max_applications must be at least 1");
        assert_eq!(
            err.to_string(),
            "configuration error: rule 'dup-arm': max_applications must be at least 1"
        );
    }
}
