use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::catalog::DEFAULT_BASE_URL;
use crate::update::MAX_ADD_BATCH;

/// Application configuration, read from YAML by [`crate::load_config::load_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the snapshot store.
    pub snapshot_dir: PathBuf,
    /// YAML file holding the watch groups.
    pub groups_file: PathBuf,
    #[serde(default)]
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSection {
    pub base_url: Option<String>,
    pub max_batch_size: Option<usize>,
}

impl AppConfig {
    pub fn base_url(&self) -> &str {
        self.catalog.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Add batch size, clamped to what the catalog accepts.
    pub fn max_batch_size(&self) -> usize {
        self.catalog
            .max_batch_size
            .unwrap_or(MAX_ADD_BATCH)
            .clamp(1, MAX_ADD_BATCH)
    }

    pub fn trace_loaded(&self) {
        info!(
            snapshot_dir = %self.snapshot_dir.display(),
            groups_file = %self.groups_file.display(),
            base_url = self.base_url(),
            max_batch_size = self.max_batch_size(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
