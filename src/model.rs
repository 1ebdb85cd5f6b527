//! Core record types shared across the fetch, retention, and mutation phases.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote-reported lifecycle state of a resource.
///
/// Only [`LifecycleState::Available`] backups are eligible for retention
/// grouping and deletion; everything else is filtered out before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    Available,
    Active,
    Faulty,
    Terminating,
    Terminated,
    Deleted,
    /// Any state this tool does not need to distinguish.
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::Available => "AVAILABLE",
            Self::Active => "ACTIVE",
            Self::Faulty => "FAULTY",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::Deleted => "DELETED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Which family of volume backups a cleanup pass targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Boot,
    Block,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Block => "block",
        }
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record returned by the remote API, normalized across the search,
/// compartment, and backup-list endpoints.
///
/// Identity is the `identifier` (opaque, globally unique). Records are
/// immutable once fetched within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub identifier: String,

    #[serde(default)]
    pub resource_type: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub compartment_id: String,

    #[serde(default)]
    pub region: String,

    /// Missing on a handful of resource types; those sort as oldest.
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub lifecycle_state: LifecycleState,

    #[serde(default)]
    pub defined_tags: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,

    /// Parent volume id; present only on backup records.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl RemoteRecord {
    /// Minimal record with just an identity, for tests and synthetic entries.
    pub fn named(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            resource_type: String::new(),
            display_name: display_name.into(),
            compartment_id: String::new(),
            region: String::new(),
            time_created: None,
            lifecycle_state: LifecycleState::Unknown,
            defined_tags: BTreeMap::new(),
            freeform_tags: BTreeMap::new(),
            parent_id: None,
        }
    }
}
