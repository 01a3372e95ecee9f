//! TOML configuration for a validation pass
//!
//! ```toml
//! [rules]
//! disabled = ["CheckUnusedInterceptors"]
//!
//! [classloading]
//! enabled = true
//! verbose = false
//! compare-modules = true
//!
//! [report]
//! colors = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse validation config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub rules: RulesConfig,
    pub classloading: ClassLoadingConfig,
    pub report: ReportConfig,
}

/// `[rules]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Rule names to leave out of the pass
    pub disabled: Vec<String>,
}

/// `[classloading]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ClassLoadingConfig {
    pub enabled: bool,
    /// List the shared classes in each diagnostic
    pub verbose: bool,
    /// Also compare each module against the modules after it
    pub compare_modules: bool,
}

impl Default for ClassLoadingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbose: false,
            compare_modules: true,
        }
    }
}

/// `[report]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub colors: bool,
}

impl ValidationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loading validation config from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn is_rule_enabled(&self, name: &str) -> bool {
        !self.rules.disabled.iter().any(|d| d == name)
    }
}
