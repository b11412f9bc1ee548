use crate::error::{FixError, Result};
use crate::rewriter::WriteMode;
use crate::rules::RuleCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Versión actual (leída desde Cargo.toml en tiempo de compilación)
pub const SENTINEL_FIX_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_FILE: &str = ".sentinel-fix.toml";

pub const DEFAULT_CHECK_COMMAND: &str = "cargo check";

/// Contents of `.sentinel-fix.toml`. Every field is optional on disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FixConfig {
    pub version: String,
    pub check_command: String,
    /// Files to rewrite, relative to the project root. Empty = catalog order.
    pub targets: Vec<PathBuf>,
    /// YAML rule catalog replacing the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    pub parallel: bool,
    pub verify: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            version: SENTINEL_FIX_VERSION.to_string(),
            check_command: DEFAULT_CHECK_COMMAND.to_string(),
            targets: Vec::new(),
            catalog: None,
            parallel: false,
            verify: true,
        }
    }
}

impl FixConfig {
    /// Loads `.sentinel-fix.toml` from `root`.
    ///
    /// `Ok(None)` when there is no file; a file that does not parse is a
    /// configuration error rather than a silent fallback to defaults.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            FixError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: FixConfig = toml::from_str(&content).map_err(|e| {
            FixError::configuration(format!("invalid {}: {}", path.display(), e))
        })?;

        Ok(Some(config.migrate()))
    }

    pub fn load_or_default(root: &Path) -> Result<Self> {
        Ok(Self::load(root)?.unwrap_or_default())
    }

    pub fn save(&self, root: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        fs::write(root.join(CONFIG_FILE), toml)?;
        Ok(())
    }

    /// Brings a config written by an older version up to date.
    fn migrate(mut self) -> Self {
        if self.version != SENTINEL_FIX_VERSION {
            debug!(from = %self.version, to = SENTINEL_FIX_VERSION, "migrating config");
            self.version = SENTINEL_FIX_VERSION.to_string();
        }
        if self.check_command.trim().is_empty() {
            self.check_command = DEFAULT_CHECK_COMMAND.to_string();
        }
        self
    }

    /// Walks up from `start` looking for a directory with a config file.
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(CONFIG_FILE).is_file())
            .map(Path::to_path_buf)
    }
}

/// Where rules come from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    Yaml(PathBuf),
}

impl CatalogSource {
    pub fn load(&self) -> Result<RuleCatalog> {
        match self {
            Self::Builtin => RuleCatalog::build(),
            Self::Yaml(path) => RuleCatalog::load_from_yaml(path),
        }
    }
}

/// Everything a run needs, resolved once.
///
/// Every target is joined onto `base_path`; the process working directory is
/// never changed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_path: PathBuf,
    pub targets: Vec<PathBuf>,
    pub catalog: CatalogSource,
    /// `None` skips the verification step.
    pub check_command: Option<String>,
    pub mode: WriteMode,
    pub parallel: bool,
}

impl RunConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self::from_config(base_path, &FixConfig::default())
    }

    pub fn from_config(base_path: impl Into<PathBuf>, config: &FixConfig) -> Self {
        let base_path = base_path.into();
        let catalog = match &config.catalog {
            Some(path) => CatalogSource::Yaml(base_path.join(path)),
            None => CatalogSource::Builtin,
        };
        Self {
            targets: config.targets.clone(),
            catalog,
            check_command: config.verify.then(|| config.check_command.clone()),
            mode: WriteMode::InPlace,
            parallel: config.parallel,
            base_path,
        }
    }
}
