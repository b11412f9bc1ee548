//! # Sentinel Fix - Rule-based rewriter for known compile errors
//!
//! Aplica catálogos de reglas regex (sustitución, plantilla estructural y
//! borrado acotado) a archivos fuente concretos, escribe los cambios de forma
//! atómica y ejecuta un comando de verificación al final.

use clap::Parser;
use colored::Colorize;
use commands::{Cli, Commands, RunArgs};
use tracing_subscriber::EnvFilter;

// Módulos
pub mod commands;
pub mod config;
pub mod error;
pub mod files;
pub mod orchestrator;
pub mod rewriter;
pub mod rules;
pub mod ui;
pub mod verify;

/// Diagnostics go to stderr so `--format json` keeps stdout clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sentinel_fix=debug" } else { "sentinel_fix=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<error::FixError>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let project_root = commands::resolve_project_root(cli.base)?;

    match cli.command {
        Some(Commands::Run(args)) => {
            commands::run::handle_run_command(&project_root, args, cli.verbose)
        }
        Some(Commands::Rules { catalog }) => {
            commands::rules::handle_rules_command(&project_root, catalog)?;
            Ok(0)
        }
        Some(Commands::Doctor) => Ok(commands::doctor::handle_doctor_command(&project_root)),
        Some(Commands::Init { force }) => {
            commands::init::handle_init_command(&project_root, force)?;
            Ok(0)
        }
        // Sin subcomando: ejecución completa con la configuración del proyecto
        None => {
            commands::run::handle_run_command(&project_root, RunArgs::default(), cli.verbose)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "❌".red(), e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
