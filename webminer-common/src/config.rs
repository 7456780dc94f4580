//! Configuration file resolution and loading
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`<config_dir>/webminer/webminer.toml`)
//! 4. `webminer.toml` in the working directory (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "WEBMINER_CONFIG";

/// File name searched for in the config directory and working directory
pub const CONFIG_FILE_NAME: &str = "webminer.toml";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the configuration file path.
///
/// A path given on the command line or through the environment must exist;
/// the two fallback locations are only used when present.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return existing(path.to_path_buf(), "command line");
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return existing(PathBuf::from(path), env_var_name);
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("webminer").join(CONFIG_FILE_NAME)) {
        if path.exists() {
            return Ok(path);
        }
    }

    // Priority 4: Working directory
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    Err(Error::Config(format!(
        "No configuration file found. Provide one using:\n\
         1. Command line: --config path/to/{name}\n\
         2. Environment: {env}=path/to/{name}\n\
         3. User config directory: <config_dir>/webminer/{name}\n\
         4. Working directory: ./{name}",
        name = CONFIG_FILE_NAME,
        env = env_var_name,
    )))
}

fn existing(path: PathBuf, source: &str) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!(
            "Config file from {} not found: {}",
            source,
            path.display()
        )))
    }
}

/// Read and deserialize a TOML file
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))?;
    Ok(config)
}

/// Deserialize TOML text
pub fn parse_toml_config<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}
