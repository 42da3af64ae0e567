//! yolk configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. `YOLK_REGISTRY_URL` environment variable (registry URL only)
//! 2. `--config <path>` or `~/.config/yolk/config.yaml`
//! 3. Built-in defaults
//!
//! ```yaml
//! registry:
//!   url: https://pypi.org
//!   timeout_seconds: 30
//! local:
//!   python: python3
//!   paths: []
//! cache:
//!   path: ~/.cache/yolk/pkglist.json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, YolkError};

/// Default registry base URL
pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org";

/// Environment variable overriding the registry URL
pub const REGISTRY_URL_ENV: &str = "YOLK_REGISTRY_URL";

/// Config file name inside the config directory
const CONFIG_FILE: &str = "config.yaml";

/// Package list cache file name inside the cache directory
const PACKAGE_LIST_FILE: &str = "pkglist.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YolkConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the PyPI-compatible registry
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Timeout applied to every registry request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Installed package discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Interpreter asked for its import path
    #[serde(default = "default_python")]
    pub python: String,

    /// Explicit lookup path; when empty, the interpreter's `sys.path` is used
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Package list cache file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_python() -> String {
    "python3".to_string()
}

impl YolkConfig {
    /// Load from the explicit path, or from the platform config directory
    ///
    /// A missing file at the default location yields defaults. A missing
    /// file at an explicit path is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(YolkError::Config {
                        path: path.to_path_buf(),
                        message: "file does not exist".to_string(),
                    });
                }
                Self::load_from_path(path)?
            }
            None => match config_dir() {
                Some(dir) => {
                    let path = dir.join(CONFIG_FILE);
                    if path.exists() {
                        Self::load_from_path(&path)?
                    } else {
                        debug!("No config file at {}, using defaults", path.display());
                        Self::default()
                    }
                }
                None => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| YolkError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: YolkConfig =
            serde_yaml_ng::from_str(&content).map_err(|e| YolkError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(REGISTRY_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Registry URL overridden by {}: {}", REGISTRY_URL_ENV, url);
                self.registry.url = url;
            }
        }
    }

    /// Where the package list cache lives
    pub fn package_list_path(&self) -> Option<PathBuf> {
        self.cache
            .path
            .clone()
            .or_else(|| cache_dir().map(|dir| dir.join(PACKAGE_LIST_FILE)))
    }
}

/// Platform config directory for yolk
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "yolk")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| dirs::config_dir().map(|d| d.join("yolk")))
}

/// Platform cache directory for yolk
pub fn cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "yolk")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .or_else(|| dirs::cache_dir().map(|d| d.join("yolk")))
}
