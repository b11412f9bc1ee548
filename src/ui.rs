//! Módulo de interfaz de usuario
//!
//! Terminal output for runs: the per-file report, the verification summary and
//! the spinner shown while the check command runs.

use crate::orchestrator::RunReport;
use crate::rewriter::{OutcomeStatus, RewriteOutcome};
use crate::verify::VerificationResult;
use colored::*;

pub fn mostrar_encabezado(dry_run: bool) {
    println!();
    println!("{}", "🛡️  Sentinel Fix".bright_cyan().bold());
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    if dry_run {
        println!("{}", "   (dry run: no file will be written)".dimmed());
    }
}

fn marker(status: OutcomeStatus) -> ColoredString {
    match status {
        OutcomeStatus::Rewritten => "✅".green(),
        OutcomeStatus::Planned => "📝".cyan(),
        OutcomeStatus::Unchanged => "⏭️ ".dimmed(),
        OutcomeStatus::NotFound => "⚠️ ".yellow(),
        OutcomeStatus::ReadFailed | OutcomeStatus::WriteFailed | OutcomeStatus::Aborted => "❌".red(),
    }
}

/// One line per file: path, status, rules applied and replacement count.
pub fn format_outcome(outcome: &RewriteOutcome) -> String {
    let mut line = format!(
        "{:<44} {:<13} {} rule(s), {} replacement(s)",
        outcome.file_path.display(),
        outcome.status.to_string(),
        outcome.rules_applied.len(),
        outcome.replacements_made,
    );
    if let Some(error) = &outcome.error {
        line.push_str(&format!("  ({})", error));
    }
    line
}

pub fn mostrar_resultado(outcome: &RewriteOutcome, verbose: bool) {
    let line = format_outcome(outcome);
    let line = if outcome.success { line.normal() } else { line.red() };
    println!("   {} {}", marker(outcome.status), line);

    if verbose && !outcome.rules_applied.is_empty() {
        println!("      └─ {}", outcome.rules_applied.join(", ").dimmed());
    }
}

pub fn mostrar_resumen(report: &RunReport) {
    let failed = report.outcomes.iter().filter(|o| !o.success).count();
    println!();
    println!(
        "   {} file(s) changed, {} replacement(s), {} failed",
        report.files_changed().to_string().cyan(),
        report.total_replacements().to_string().cyan(),
        if failed > 0 { failed.to_string().red() } else { failed.to_string().green() },
    );
}

pub fn mostrar_verificacion(result: Option<&VerificationResult>) {
    match result {
        None => println!("   {} {}", "⏭️ ".dimmed(), "Verification skipped".dimmed()),
        Some(v) if v.passed => {
            println!("   {} Verification passed ({})", "✅".green(), v.command.cyan());
        }
        Some(v) => {
            println!("   {} {}", "❌".red(), "Verification failed".red().bold());
            if let Some(err) = v.failure() {
                println!("      └─ {}", err.to_string().red());
            }
            if !v.raw_output.trim().is_empty() {
                println!();
                println!("{}", v.raw_output.trim_end().dimmed());
            }
        }
    }
    println!();
}

pub fn crear_progreso(mensaje: &str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    let style = indicatif::ProgressStyle::default_spinner().template("{spinner:.green} {msg}");
    if let Ok(style) = style {
        pb.set_style(style);
    }
    pb.set_message(mensaje.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
