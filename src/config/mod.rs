//! Configuration for the housekeeping jobs.
//!
//! Configured via a TOML file; every section is optional with defaults so a
//! run can be driven entirely from CLI flags. CLI flags override file values.
//!
//! # Example
//!
//! ```toml
//! [remote]
//! endpoint = "https://api.us-ashburn-1.example.com"
//!
//! [retry]
//! max_retries = 5
//! initial_delay_ms = 500
//!
//! [cleanup]
//! compartment_id = "ocid1.compartment.oc1..prod"
//! keep_count = 7
//! pacing_ms = 500
//! ```

mod cleanup;
mod inventory;
mod remote;
mod retry;

use std::path::{Path, PathBuf};

pub use cleanup::CleanupConfig;
pub use inventory::InventoryConfig;
pub use remote::RemoteConfig;
pub use retry::RetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal to the run and occur before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("keep-count must be at least 1, got {0}")]
    InvalidRetention(u32),

    #[error("boot-only and block-only are mutually exclusive")]
    ConflictingScope,

    #[error("a compartment scope is required for cleanup")]
    MissingCompartment,

    #[error("a tenancy id is required for inventory")]
    MissingTenancy,

    #[error("a remote endpoint is required")]
    MissingEndpoint,

    #[error("invalid remote endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Remote API connection settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Retry policy shared by page fetches and delete calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Backup retention cleanup settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Resource inventory export settings.
    #[serde(default)]
    pub inventory: InventoryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
