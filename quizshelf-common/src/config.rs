//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the library root folder
pub const ROOT_FOLDER_ENV: &str = "QUIZSHELF_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "library.db";

/// Resource directory name inside the root folder
pub const RESOURCE_DIR: &str = "resources";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Library root folder (database + resources)
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub library: LibrarySettings,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "quizshelf_library=info,quizshelf_common=info".to_string(),
        }
    }
}

/// Library service tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Broadcast capacity of the library EventBus
    pub event_capacity: usize,
    /// Bounded capacity of the command queue feeding the library task
    pub command_capacity: usize,
    /// Gzip level used when exporting packages (0-9)
    pub compression_level: u32,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            event_capacity: 100,
            command_capacity: 16,
            compression_level: 6,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        if config.library.compression_level > 9 {
            return Err(Error::Config(format!(
                "compression_level must be 0-9, got {}",
                config.library.compression_level
            )));
        }
        Ok(config)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        Self::from_toml_str(&content)
    }
}

/// Platform config file location (`<config_dir>/quizshelf/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quizshelf").join("config.toml"))
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("quizshelf"))
        .unwrap_or_else(|| PathBuf::from("./quizshelf_data"))
}

/// Locations derived from the library root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub root: PathBuf,
    pub database: PathBuf,
    pub resources: PathBuf,
}

impl LibraryPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            database: root.join(DATABASE_FILE),
            resources: root.join(RESOURCE_DIR),
            root,
        }
    }

    /// Create the root and resource directories if missing
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.resources)?;
        Ok(())
    }
}
