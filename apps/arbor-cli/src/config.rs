//! Application configuration, read from YAML.
//!
//! ```yaml
//! logs:
//!   level: info
//! backend:
//!   type: file          # or `sqlite` with `path: ./arbor.db`, or `memory`
//!   root: ./arbor-data
//! ```

use std::path::{Path, PathBuf};

use arbor_store::BackendConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "ARBOR_CONFIG";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Any `EnvFilter` directive, e.g. `info` or `arbor_store=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logs: LogConfig,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Parse and validate YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, else the `ARBOR_CONFIG` file, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Self::from_yaml(&text)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logs.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logs.level must not be empty".into()));
        }
        EnvFilter::try_new(&self.logs.level).map_err(|e| {
            ConfigError::Invalid(format!("logs.level {:?}: {e}", self.logs.level))
        })?;
        match &self.backend {
            BackendConfig::File { root } if root.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("backend.root must not be empty".into()))
            }
            BackendConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("backend.path must not be empty".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
