//! Application configuration loading.

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "bingotui";

const CONFIG_FILE: &str = "config.toml";

/// User-tunable application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the saved-card blob.
    pub data_root: PathBuf,
    /// Optional extra line appended to generated share messages.
    #[serde(default)]
    pub share_footer: Option<String>,
}

impl AppConfig {
    /// Platform config directory for this application.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Path of the optional `config.toml`.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    /// Load settings from defaults, the config file (when present) and
    /// `BINGOTUI_*` environment overrides, in that order.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    fn load_from(path: PathBuf) -> Result<Self> {
        let default_root = Self::config_dir();
        let settings = Config::builder()
            .set_default("data_root", default_root.to_string_lossy().to_string())
            .context("failed to set default data root")?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("BINGOTUI"))
            .build()
            .context("failed to load configuration")?;
        let config: Self = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        debug!(data_root = %config.data_root.display(), "Configuration loaded");
        Ok(config)
    }
}

/// Create the config directory and write a commented template on first
/// run. Existing files are left untouched.
pub fn ensure_default_config() -> Result<()> {
    let dir = AppConfig::config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let path = AppConfig::config_path();
    if path.exists() {
        return Ok(());
    }

    let template = "\
# bingotui configuration. All keys are optional.

# Directory where saved cards live. Defaults to this directory.
#data_root = \"~/.config/bingotui\"

# Extra line appended to generated share messages.
#share_footer = \"Get the app: https://example.com/bingotui\"
";
    std::fs::write(&path, template)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "data_root = \"/tmp/bingo-cards\"\nshare_footer = \"hello\"\n",
        )?;
        let config = AppConfig::load_from(path)?;
        assert_eq!(config.data_root, PathBuf::from("/tmp/bingo-cards"));
        assert_eq!(config.share_footer.as_deref(), Some("hello"));
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join(CONFIG_FILE))?;
        assert_eq!(config.data_root, AppConfig::config_dir());
        assert!(config.share_footer.is_none());
        Ok(())
    }
}
