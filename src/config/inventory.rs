//! Inventory export configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Settings for the tenancy-wide resource inventory export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Root of the compartment tree to resolve names from. Required.
    #[serde(default)]
    pub tenancy_id: String,

    /// Limit the search to a single compartment instead of the whole tenancy.
    #[serde(default)]
    pub compartment_id: Option<String>,

    /// Filter resources by lifecycle state (e.g. `ACTIVE`). Free-form because
    /// the search endpoint accepts states this tool does not enumerate.
    #[serde(default)]
    pub lifecycle_state: Option<String>,

    /// Include non-ACTIVE compartments in the name index.
    #[serde(default)]
    pub include_inactive_compartments: bool,

    /// Path of the CSV report. Defaults to a timestamped file in the
    /// working directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl InventoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenancy_id.is_empty() {
            return Err(ConfigError::MissingTenancy);
        }
        Ok(())
    }
}
