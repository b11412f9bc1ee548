use crate::config::{CatalogSource, FixConfig, RunConfig};
use crate::rules::{Rule, RuleCatalog};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub fn handle_rules_command(project_root: &Path, catalog: Option<PathBuf>) -> anyhow::Result<()> {
    let config = FixConfig::load_or_default(project_root)?;
    let source = match catalog {
        Some(path) => CatalogSource::Yaml(project_root.join(path)),
        None => RunConfig::from_config(project_root, &config).catalog,
    };
    let catalog = source.load()?;

    match &source {
        CatalogSource::Builtin => println!("\n{}", "Reglas activas (built-in catalog):".bold()),
        CatalogSource::Yaml(path) => {
            println!("\n{} {}", "Reglas activas:".bold(), path.display().to_string().cyan())
        }
    }

    for (name, files) in group_by_name(&catalog) {
        let Some(set) = files.first().and_then(|f| catalog.get(f)) else {
            continue;
        };
        println!();
        println!("  {} {}", "▸".cyan(), name.yellow().bold());
        if let Some(description) = catalog.description(name) {
            println!("    {}", description.dimmed());
        }
        for file in &files {
            println!("    {} {}", "└─".dimmed(), file.display());
        }
        for rule in set.rules() {
            println!("      {}", describe(rule));
        }
    }

    println!();
    println!(
        "   Info: {} rule set(s). Order is the application order.",
        catalog.len()
    );
    println!(
        "   Set `catalog = \"path/to/rules.yaml\"` in .sentinel-fix.toml to use your own rules."
    );
    Ok(())
}

fn describe(rule: &Rule) -> String {
    let bound = rule
        .max_applications()
        .map(|n| format!(" max={}", n))
        .unwrap_or_default();
    let mut line = format!(
        "{:<34} {:<16}{}",
        rule.id(),
        format!("[{}]", rule.kind()),
        bound
    );
    if let Some(description) = rule.description() {
        line.push_str("  ");
        line.push_str(&description.dimmed().to_string());
    }
    line
}

/// Rule sets expanded from one definition share a name; list them once.
fn group_by_name(catalog: &RuleCatalog) -> Vec<(&str, Vec<PathBuf>)> {
    let mut groups: Vec<(&str, Vec<PathBuf>)> = Vec::new();
    for set in catalog.rule_sets() {
        match groups.iter().position(|(name, _)| *name == set.name()) {
            Some(i) => groups[i].1.push(set.file().to_path_buf()),
            None => groups.push((set.name(), vec![set.file().to_path_buf()])),
        }
    }
    groups
}
