/// `load_config` module: reads the YAML application config into [`AppConfig`].
///
/// This is the only place where the user-supplied config file is parsed. Secrets
/// (the catalog access token) never live in this file; they come from the
/// environment when the catalog client is built.
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path attached, and are
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::AppConfig;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: AppConfig = serde_yaml::from_str(&config_content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .with_context(|| format!("Failed to parse config YAML {:?}", path_ref))?;

    config.trace_loaded();
    Ok(config)
}
