pub mod doctor;
pub mod init;
pub mod rules;
pub mod run;

use crate::config::FixConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentinel-fix")]
#[command(about = "Rule-based rewriter for known compile errors", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project root (por defecto: el directorio con .sentinel-fix.toml, o el actual)
    #[arg(long, global = true)]
    pub base: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite the target files and run the check command
    Run(RunArgs),
    /// List every rule set and its rules
    Rules {
        /// YAML catalog to list instead of the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Check config, catalog, target files and the check command
    Doctor,
    /// Write a default .sentinel-fix.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Files to rewrite (default: config targets, then catalog order)
    pub targets: Vec<PathBuf>,

    /// Compute the changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the check command
    #[arg(long)]
    pub no_verify: bool,

    /// Rewrite files concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Check command to run afterwards (default: cargo check)
    #[arg(long)]
    pub check_cmd: Option<String>,

    /// YAML catalog replacing the built-in rules
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// `--base`, else the nearest ancestor with a config file, else the current dir.
pub fn resolve_project_root(base: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(base) = base {
        return Ok(base);
    }
    let cwd = std::env::current_dir()?;
    Ok(FixConfig::find_project_root(&cwd).unwrap_or(cwd))
}
