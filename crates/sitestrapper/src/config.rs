//! Configuration file (sitestrapper.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Port the preview server uses when neither flag nor config sets one.
pub const DEFAULT_PORT: u16 = 4000;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct SiteConfig {
    /// Content root
    pub input: Option<PathBuf>,
    /// Where the generated site is written
    pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Load configuration if the file exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}
