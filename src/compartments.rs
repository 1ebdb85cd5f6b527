//! Compartment tree resolution for the inventory report.
//!
//! Builds the id-to-name index once per run by walking the compartment tree
//! from the tenancy root. Subtrees the caller cannot list are logged and
//! skipped, never fatal: a partial inventory is still useful.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::fetch::{PageSource, fetch_all};
use crate::model::LifecycleState;
use crate::remote::{Page, RemoteClient, RemoteError};

/// Compartment id to display name, built once per run and read-only after.
pub type CompartmentIndex = HashMap<String, String>;

/// Fallback name for compartments that cannot be resolved.
pub const UNKNOWN_COMPARTMENT: &str = "Unknown";

struct CompartmentPages<'a> {
    client: &'a dyn RemoteClient,
    parent_id: &'a str,
}

#[async_trait]
impl PageSource for CompartmentPages<'_> {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page, RemoteError> {
        self.client
            .list_compartments(self.parent_id, page_token)
            .await
    }
}

/// Resolve every compartment reachable from the tenancy root into an
/// id-to-name index. The root itself is labeled with the tenancy's name.
///
/// By default only ACTIVE compartments are indexed; `include_inactive`
/// lifts the filter. Subtree walks recurse only into indexed compartments.
pub async fn resolve_all(
    client: &dyn RemoteClient,
    retry: &RetryConfig,
    tenancy_id: &str,
    include_inactive: bool,
) -> CompartmentIndex {
    let mut index = CompartmentIndex::new();

    match crate::remote::retry::with_retry(retry, "get_tenancy", || client.get_tenancy(tenancy_id))
        .await
    {
        Ok((tenancy, _)) => {
            index.insert(tenancy.identifier, tenancy.display_name);
        }
        Err(e) => {
            warn!(
                tenancy = tenancy_id,
                error = %e,
                "could not resolve tenancy name, labeling root as unknown"
            );
            index.insert(tenancy_id.to_string(), UNKNOWN_COMPARTMENT.to_string());
        }
    }

    let mut pending: VecDeque<String> = VecDeque::from([tenancy_id.to_string()]);

    while let Some(parent_id) = pending.pop_front() {
        let source = CompartmentPages {
            client,
            parent_id: &parent_id,
        };
        let stream = fetch_all(&source, retry, "list_compartments");
        futures::pin_mut!(stream);

        loop {
            match stream.next().await {
                Some(Ok(compartment)) => {
                    if !include_inactive && compartment.lifecycle_state != LifecycleState::Active {
                        debug!(
                            compartment = %compartment.identifier,
                            state = %compartment.lifecycle_state,
                            "skipping inactive compartment"
                        );
                        continue;
                    }
                    pending.push_back(compartment.identifier.clone());
                    index.insert(compartment.identifier, compartment.display_name);
                }
                Some(Err(e)) => {
                    // Permission denied or an unavailable subtree: skip it and
                    // keep what we have.
                    warn!(
                        parent = %parent_id,
                        error = %e,
                        "skipping compartment subtree"
                    );
                    break;
                }
                None => break,
            }
        }
    }

    debug!(count = index.len(), "compartment index resolved");
    index
}
