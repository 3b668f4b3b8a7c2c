use crate::search::{FilterParams, SearchCache};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterParams,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Defaults to `<cache dir>/tocfilter`
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_memory_entries")]
    pub memory_entries: usize,
    /// Longest key stored under its own name instead of a digest
    #[serde(default = "default_verbatim_key_limit")]
    pub verbatim_key_limit: usize,
}

fn default_cache_enabled() -> bool {
    true
}
fn default_memory_entries() -> usize {
    128
}
fn default_verbatim_key_limit() -> usize {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            root: None,
            memory_entries: default_memory_entries(),
            verbatim_key_limit: default_verbatim_key_limit(),
        }
    }
}

impl CacheConfig {
    pub fn resolved_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("tocfilter")
        })
    }

    pub fn build(&self) -> SearchCache {
        if self.enabled {
            SearchCache::new(
                self.resolved_root(),
                self.memory_entries,
                self.verbatim_key_limit,
            )
        } else {
            SearchCache::disabled()
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub auto_backtrack: bool,
}

impl Config {
    /// Load from `explicit` when given, otherwise from the first config file found
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_path()?,
        };
        if let Some(path) = config_path {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str(&content).with_context(|| "Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    fn find_config_path() -> Result<Option<PathBuf>> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("tocfilter/config.toml");
            if xdg_path.exists() {
                return Ok(Some(xdg_path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".tocfilter.toml");
            if home_path.exists() {
                return Ok(Some(home_path));
            }
        }

        let current_path = Path::new(".tocfilter.toml");
        if current_path.exists() {
            return Ok(Some(current_path.to_path_buf()));
        }

        Ok(None)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
