//! Remote API boundary.
//!
//! The rest of the crate depends only on the [`RemoteClient`] trait and the
//! [`RemoteError`] taxonomy, never on a specific wire protocol. The
//! `reqwest`-backed implementation lives in [`http`]; tests substitute
//! in-memory fakes.

pub mod http;
pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpRemoteClient;

use crate::model::{BackupKind, RemoteRecord};

/// Error returned by remote API calls, classified into transient and
/// permanent kinds.
///
/// Transient errors (rate limit, timeout, server-side failures) may succeed
/// on retry; permanent errors (not found, denied, conflicting state) will
/// not, and are never retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("rate limited by remote API")]
    RateLimited,

    #[error("remote call timed out")]
    Timeout,

    #[error("remote server error (status {0})")]
    Server(u16),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflicting resource state: {0}")]
    Conflict(String),

    #[error("unexpected remote response: {0}")]
    InvalidResponse(String),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Server(_) => true,
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::NotFound(_)
            | Self::PermissionDenied(_)
            | Self::Conflict(_)
            | Self::InvalidResponse(_) => false,
        }
    }
}

/// One page of a server-paginated result set.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RemoteRecord>,
    /// Continuation token for the next page; `None` means the result set
    /// is exhausted.
    pub next_token: Option<String>,
}

/// The list/search/delete surface of the resource-management API.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Structured search across the tenancy.
    async fn search_resources(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError>;

    /// List the direct child compartments of `parent_id`.
    async fn list_compartments(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError>;

    /// Fetch the tenancy root record (its display name labels the root of
    /// the compartment index).
    async fn get_tenancy(&self, tenancy_id: &str) -> Result<RemoteRecord, RemoteError>;

    /// List volume backups of one kind in a compartment.
    async fn list_backups(
        &self,
        kind: BackupKind,
        compartment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError>;

    /// Delete a single backup. Deletes are not transactional; a completed
    /// delete stands even if the run is interrupted afterwards.
    async fn delete_backup(&self, kind: BackupKind, identifier: &str) -> Result<(), RemoteError>;
}
