use crate::config::{FixConfig, CONFIG_FILE};
use crate::rules::RuleCatalog;
use colored::Colorize;
use std::path::Path;

/// Writes a default `.sentinel-fix.toml` listing the built-in targets.
pub fn handle_init_command(project_root: &Path, force: bool) -> anyhow::Result<()> {
    let config_path = project_root.join(CONFIG_FILE);
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            "⚠️".yellow(),
            config_path.display()
        );
        return Ok(());
    }

    let catalog = RuleCatalog::build()?;
    let config = FixConfig {
        targets: catalog.files().map(Path::to_path_buf).collect(),
        ..FixConfig::default()
    };
    config.save(project_root)?;

    println!(
        "{} Created {} with {} target(s)",
        "✅".green(),
        config_path.display().to_string().cyan(),
        config.targets.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_builtin_targets() {
        let tmp = TempDir::new().unwrap();
        handle_init_command(tmp.path(), false).unwrap();

        let config = FixConfig::load(tmp.path()).unwrap().unwrap();
        assert_eq!(config.targets.len(), 9);
        assert_eq!(config.targets[0], Path::new("src/message_store.rs"));
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "check_command = \"make\"\n").unwrap();

        handle_init_command(tmp.path(), false).unwrap();
        let config = FixConfig::load(tmp.path()).unwrap().unwrap();
        assert_eq!(config.check_command, "make");

        handle_init_command(tmp.path(), true).unwrap();
        let config = FixConfig::load(tmp.path()).unwrap().unwrap();
        assert_eq!(config.check_command, "cargo check");
    }
}
