//! Módulo de verificación
//!
//! Runs the external build/check command once every file has been rewritten
//! and reports whether it passed. The output is captured as-is, never parsed.

use crate::error::FixError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub command: String,
    pub passed: bool,
    pub exit_code: Option<i32>,
    pub raw_output: String,
}

impl VerificationResult {
    pub fn failure(&self) -> Option<FixError> {
        if self.passed {
            return None;
        }
        let reason = match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "did not run to completion".to_string(),
        };
        Some(FixError::VerificationFailure {
            command: self.command.clone(),
            reason,
        })
    }
}

pub struct Verifier {
    command: String,
    working_dir: PathBuf,
}

impl Verifier {
    pub fn new(command: impl Into<String>, working_dir: &Path) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Runs the command through the platform shell and waits for it.
    pub fn verify(&self) -> VerificationResult {
        debug!(command = %self.command, dir = %self.working_dir.display(), "running check command");

        let output = shell(&self.command)
            .current_dir(&self.working_dir)
            .output();

        match output {
            Ok(out) => {
                let stdout = String::from_utf8_lossy(&out.stdout).to_string();
                let stderr = String::from_utf8_lossy(&out.stderr).to_string();

                // Compilers report on stderr, keep both.
                let raw_output = if !stderr.is_empty() {
                    format!("{}\n{}", stdout, stderr)
                } else {
                    stdout
                };

                VerificationResult {
                    command: self.command.clone(),
                    passed: out.status.success(),
                    exit_code: out.status.code(),
                    raw_output,
                }
            }
            Err(e) => VerificationResult {
                command: self.command.clone(),
                passed: false,
                exit_code: None,
                raw_output: format!("failed to run `{}`: {}", self.command, e),
            },
        }
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
