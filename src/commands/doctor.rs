use crate::config::{FixConfig, RunConfig, CONFIG_FILE};
use crate::orchestrator::Orchestrator;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Loads `.sentinel-fix.toml`; `Ok(None)` means defaults will be used.
pub fn check_config(project_root: &Path) -> anyhow::Result<Option<FixConfig>> {
    Ok(FixConfig::load(project_root)?)
}

/// Target files that do not exist under the project root.
pub fn check_targets(project_root: &Path, targets: &[PathBuf]) -> Vec<PathBuf> {
    targets
        .iter()
        .filter(|t| !project_root.join(t).is_file())
        .cloned()
        .collect()
}

/// Whether the program of a shell command line can be found on `PATH`.
pub fn check_command_available(command: &str) -> bool {
    let Some(program) = command.split_whitespace().next() else {
        return false;
    };
    let program = Path::new(program);
    if program.components().count() > 1 {
        return program.is_file();
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        candidate.is_file() || (cfg!(windows) && candidate.with_extension("exe").is_file())
    })
}

/// Main handler for the doctor command with colored output.
/// Returns the exit code: 1 when a critical check failed.
pub fn handle_doctor_command(project_root: &Path) -> i32 {
    println!("\n{}", "🏥 Sentinel Fix Doctor".bold().cyan());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut issues = 0;

    // Check 1: Config file
    print!("   ");
    let config = match check_config(project_root) {
        Ok(Some(config)) => {
            println!("{} Config file", "✅".green());
            println!("      └─ {}", project_root.join(CONFIG_FILE).display().to_string().cyan());
            config
        }
        Ok(None) => {
            println!("{} Config file", "⚠️ ".yellow());
            println!("      └─ {}", "Not found, using defaults. Run 'sentinel-fix init' to create one".yellow());
            FixConfig::default()
        }
        Err(e) => {
            println!("{} Config file", "❌".red());
            println!("      └─ Error: {}", e.to_string().red());
            println!();
            return 1;
        }
    };

    // Check 2: Rule catalog
    print!("   ");
    let orchestrator = match Orchestrator::new(RunConfig::from_config(project_root, &config)) {
        Ok(orchestrator) if orchestrator.catalog().is_empty() => {
            println!("{} Rule catalog", "❌".red());
            println!("      └─ {}", "No rule sets defined, nothing would be rewritten".red());
            issues += 1;
            Some(orchestrator)
        }
        Ok(orchestrator) => {
            let rules: usize = orchestrator.catalog().rule_sets().iter().map(|s| s.len()).sum();
            println!("{} Rule catalog", "✅".green());
            println!(
                "      └─ {} rule set(s), {} rule(s)",
                orchestrator.catalog().len().to_string().cyan(),
                rules.to_string().cyan()
            );
            Some(orchestrator)
        }
        Err(e) => {
            println!("{} Rule catalog", "❌".red());
            println!("      └─ Error: {}", e.to_string().red());
            issues += 1;
            None
        }
    };

    // Check 3: Target files
    if let Some(orchestrator) = &orchestrator {
        print!("   ");
        let targets = orchestrator.default_targets();
        let missing = check_targets(project_root, &targets);
        if missing.is_empty() {
            println!("{} Target files", "✅".green());
            println!("      └─ {} file(s) present", targets.len().to_string().cyan());
        } else {
            println!("{} Target files", "❌".red());
            for file in &missing {
                println!("      └─ missing: {}", file.display().to_string().red());
            }
            issues += 1;
        }
    }

    // Check 4: Check command
    print!("   ");
    if !config.verify {
        println!("{} Check command", "⏭️ ".dimmed());
        println!("      └─ {}", "verify = false".dimmed());
    } else if check_command_available(&config.check_command) {
        println!("{} Check command", "✅".green());
        println!("      └─ {}", config.check_command.cyan());
    } else {
        println!("{} Check command", "❌".red());
        println!("      └─ {} {}", "Program not found on PATH:".red(), config.check_command);
        issues += 1;
    }

    // Summary
    println!();
    if issues == 0 {
        println!("{}", "✅ All critical checks passed!".green().bold());
    } else if issues == 1 {
        println!("{}", format!("⚠️  {} critical issue found", issues).yellow().bold());
    } else {
        println!("{}", format!("⚠️  {} critical issues found", issues).yellow().bold());
    }
    println!();

    if issues > 0 { 1 } else { 0 }
}
