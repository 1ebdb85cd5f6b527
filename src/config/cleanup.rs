//! Backup cleanup configuration.
//!
//! Controls the retention pass over boot and block volume backups. The
//! keep-count has no usable default: a value of at least 1 must be supplied
//! (via config file or `--keep`) before any remote call is made.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::model::{BackupKind, LifecycleState};

/// Settings for the backup retention cleanup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    /// Compartment whose backups are scanned. Required.
    #[serde(default)]
    pub compartment_id: String,

    /// Number of newest backups to keep per volume. Required, must be >= 1;
    /// a group is never emptied.
    #[serde(default)]
    pub keep_count: u32,

    /// If true, log what would be deleted without calling the remote API.
    #[serde(default)]
    pub dry_run: bool,

    /// Only process boot volume backups. Mutually exclusive with `block_only`.
    #[serde(default)]
    pub boot_only: bool,

    /// Only process block volume backups. Mutually exclusive with `boot_only`.
    #[serde(default)]
    pub block_only: bool,

    /// Sleep between successive delete calls, in milliseconds, to respect
    /// remote rate limits. 0 disables pacing.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Only backups in this lifecycle state are eligible for deletion.
    #[serde(default = "default_lifecycle_state")]
    pub lifecycle_state: LifecycleState,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            compartment_id: String::new(),
            keep_count: 0,
            dry_run: false,
            boot_only: false,
            block_only: false,
            pacing_ms: default_pacing_ms(),
            lifecycle_state: default_lifecycle_state(),
        }
    }
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_lifecycle_state() -> LifecycleState {
    LifecycleState::Available
}

impl CleanupConfig {
    /// Fail fast on unusable settings, before any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boot_only && self.block_only {
            return Err(ConfigError::ConflictingScope);
        }
        if self.compartment_id.is_empty() {
            return Err(ConfigError::MissingCompartment);
        }
        if self.keep_count < 1 {
            return Err(ConfigError::InvalidRetention(self.keep_count));
        }
        Ok(())
    }

    /// Backup kinds this run processes, in pass order.
    pub fn kinds(&self) -> Vec<BackupKind> {
        match (self.boot_only, self.block_only) {
            (true, false) => vec![BackupKind::Boot],
            (false, true) => vec![BackupKind::Block],
            _ => vec![BackupKind::Boot, BackupKind::Block],
        }
    }

    /// Pacing interval between delete calls.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
