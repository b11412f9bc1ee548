use crate::commands::{OutputFormat, RunArgs};
use crate::config::{CatalogSource, FixConfig, RunConfig};
use crate::orchestrator::{Orchestrator, RunReport};
use crate::rewriter::WriteMode;
use crate::ui;
use anyhow::Context;
use std::path::Path;

/// Merges `.sentinel-fix.toml` with the command line flags.
pub fn build_run_config(project_root: &Path, args: &RunArgs) -> anyhow::Result<RunConfig> {
    let file_config = FixConfig::load_or_default(project_root)?;
    let mut config = RunConfig::from_config(project_root, &file_config);

    if !args.targets.is_empty() {
        config.targets = args.targets.clone();
    }
    if let Some(catalog) = &args.catalog {
        config.catalog = CatalogSource::Yaml(project_root.join(catalog));
    }
    if let Some(cmd) = &args.check_cmd {
        config.check_command = Some(cmd.clone());
    }
    if args.no_verify {
        config.check_command = None;
    }
    if args.dry_run {
        config.mode = WriteMode::DryRun;
    }
    config.parallel |= args.parallel;

    Ok(config)
}

/// Returns the process exit code: 0 clean, 1 when a file or the check failed.
pub fn handle_run_command(
    project_root: &Path,
    args: RunArgs,
    verbose: bool,
) -> anyhow::Result<i32> {
    let config = build_run_config(project_root, &args)?;
    let orchestrator = Orchestrator::new(config).context("cannot build the rule catalog")?;
    let targets = orchestrator.default_targets();

    let report = match args.format {
        OutputFormat::Json => {
            let report = orchestrator.run(&targets);
            println!("{}", serde_json::to_string_pretty(&report)?);
            report
        }
        OutputFormat::Text => run_with_progress(&orchestrator, &targets, args.dry_run, verbose),
    };

    Ok(if report.is_clean() { 0 } else { 1 })
}

fn run_with_progress(
    orchestrator: &Orchestrator,
    targets: &[std::path::PathBuf],
    dry_run: bool,
    verbose: bool,
) -> RunReport {
    ui::mostrar_encabezado(dry_run);

    let outcomes = orchestrator.rewrite(targets);
    for outcome in &outcomes {
        ui::mostrar_resultado(outcome, verbose);
    }

    let verification = match orchestrator.config().check_command.as_deref() {
        Some(cmd) if !dry_run => {
            println!();
            let pb = ui::crear_progreso(&format!("Running {}...", cmd));
            let result = orchestrator.verify();
            pb.finish_and_clear();
            result
        }
        _ => None,
    };

    let report = RunReport {
        outcomes,
        verification,
    };
    ui::mostrar_resumen(&report);
    ui::mostrar_verificacion(report.verification.as_ref());
    report
}
