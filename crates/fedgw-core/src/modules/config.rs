//! Gateway configuration file loading.

use fedgw_types::{ConfigError, GatewayConfig};
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::GatewayResult;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "FEDGW_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "fedgw.json";

/// Path from `FEDGW_CONFIG`, or `fedgw.json` in the working directory.
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Read, parse and validate a JSON configuration file.
pub fn load_config(path: &Path) -> GatewayResult<GatewayConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.display().to_string() }.into());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> GatewayResult<GatewayConfig> {
    let config: GatewayConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.validate().map_err(|e| ConfigError::invalid(&first_invalid_field(&e), e.to_string()))?;
    tracing::debug!(controllers = config.controllers.len(), "Loaded gateway configuration");
    Ok(config)
}

fn first_invalid_field(errors: &validator::ValidationErrors) -> String {
    errors.errors().keys().next().map(|k| k.to_string()).unwrap_or_else(|| "config".to_string())
}
