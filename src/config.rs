use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::install::download::github::GITHUB_API;
use crate::install::error::{BootstrapError, Result};

/// Which server executable the editor should launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LanguageServerSource {
    /// Managed binary under the extension root, kept up to date
    #[default]
    Embedded,
    /// Binary already on the search path, version-checked only
    SystemPath,
}

/// Bootstrap configuration (mirrors the editor's `ginko.*` settings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
    pub language_server: LanguageServerSource,
    /// Extension-private root; defaults to the platform data directory
    pub root: Option<PathBuf>,
    pub binary_name: String,
    pub owner: String,
    pub repo: String,
    pub api_base_url: String,
    pub download_timeout_secs: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            language_server: LanguageServerSource::Embedded,
            root: None,
            binary_name: "ginko_ls".to_string(),
            owner: "Schottkyc137".to_string(),
            repo: "ginko".to_string(),
            api_base_url: GITHUB_API.to_string(),
            download_timeout_secs: 60,
        }
    }
}

impl BootstrapConfig {
    /// `<config dir>/ginko/bootstrap.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ginko").join("bootstrap.toml"))
    }

    /// Parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| BootstrapError::Config {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| BootstrapError::Config {
            reason: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, writing the default configuration there first if it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config not found at {}, creating default configuration",
                path.display()
            );
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let default_toml =
                toml::to_string_pretty(&Self::default()).map_err(|e| BootstrapError::Config {
                    reason: format!("cannot serialize default config: {e}"),
                })?;
            fs::write(path, default_toml)?;
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.binary_name.trim().is_empty() {
            return Err(BootstrapError::Config {
                reason: "binaryName must not be empty".to_string(),
            });
        }
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(BootstrapError::Config {
                reason: "owner and repo must not be empty".to_string(),
            });
        }
        if self.download_timeout_secs == 0 {
            return Err(BootstrapError::Config {
                reason: "downloadTimeoutSecs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Extension-private root the `server/` tree lives under
    pub fn resolved_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => dirs::data_local_dir()
                .map(|dir| dir.join("ginko"))
                .ok_or_else(|| BootstrapError::Config {
                    reason: "could not determine a data directory; set `root`".to_string(),
                }),
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
