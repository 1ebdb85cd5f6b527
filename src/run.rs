//! Run coordination: fetch, group, decide, act, summarize.
//!
//! The coordinator is the only component with ordering and side-effect
//! responsibility across the others. Configuration and traversal errors are
//! fatal; per-item mutation failures are isolated and surface only as a
//! non-zero failed count in the summary.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::TryStreamExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::compartments;
use crate::config::{CleanupConfig, ConfigError, InventoryConfig, RetryConfig};
use crate::fetch::{FetchError, PageSource, fetch_all};
use crate::inventory;
use crate::model::{BackupKind, RemoteRecord};
use crate::mutate::{self, ApplySettings, OutcomeKind};
use crate::remote::{Page, RemoteClient, RemoteError};
use crate::retention::{self, Verdict};

/// Fatal run-level failure.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write inventory report: {0}")]
    Report(#[from] csv::Error),
}

/// Aggregated counts for a cleanup run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Backups fetched, including ones filtered out before grouping.
    pub total_scanned: u64,
    /// KEEP decisions.
    pub total_kept: u64,
    /// Successful deletes.
    pub total_deleted: u64,
    /// Deletes that failed permanently or exhausted their retry budget.
    pub total_failed: u64,
    /// Deletes skipped because of dry-run mode.
    pub total_dry_run: u64,
}

/// Result of an inventory run.
#[derive(Debug)]
pub struct InventorySummary {
    pub total_resources: u64,
    pub compartments_resolved: u64,
    pub report_path: Option<PathBuf>,
}

struct BackupPages<'a> {
    client: &'a dyn RemoteClient,
    kind: BackupKind,
    compartment_id: &'a str,
}

#[async_trait]
impl PageSource for BackupPages<'_> {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page, RemoteError> {
        self.client
            .list_backups(self.kind, self.compartment_id, page_token)
            .await
    }
}

struct SearchPages<'a> {
    client: &'a dyn RemoteClient,
    query: &'a str,
}

#[async_trait]
impl PageSource for SearchPages<'_> {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page, RemoteError> {
        self.client.search_resources(self.query, page_token).await
    }
}

/// Run the backup retention cleanup.
///
/// Validates configuration before any remote call, then for each backup
/// kind in scope: fetch, filter to the eligible lifecycle state, group by
/// volume, decide, and apply. One decision line is logged per record before
/// anything is executed, so a dry-run log diffs cleanly against a real one.
pub async fn run_cleanup(
    client: &dyn RemoteClient,
    cleanup: &CleanupConfig,
    retry: &RetryConfig,
) -> Result<RunSummary, RunError> {
    cleanup.validate()?;

    let settings = ApplySettings {
        dry_run: cleanup.dry_run,
        pacing: cleanup.pacing(),
    };
    let mut summary = RunSummary::default();

    for kind in cleanup.kinds() {
        info!(kind = %kind, compartment = %cleanup.compartment_id, "scanning backups");

        let source = BackupPages {
            client,
            kind,
            compartment_id: &cleanup.compartment_id,
        };
        let records: Vec<RemoteRecord> = fetch_all(&source, retry, "list_backups")
            .try_collect()
            .await?;
        summary.total_scanned += records.len() as u64;

        let eligible: Vec<RemoteRecord> = records
            .into_iter()
            .filter(|r| r.lifecycle_state == cleanup.lifecycle_state)
            .collect();

        let mut decisions = Vec::new();
        for (key, group) in retention::group_by_volume(eligible) {
            decisions.extend(retention::decide(&key, group, cleanup.keep_count as usize));
        }

        for decision in &decisions {
            info!(
                kind = %kind,
                verdict = %decision.verdict,
                reason = %decision.reason,
                backup = %decision.record.identifier,
                name = %decision.record.display_name,
                "retention decision"
            );
        }
        summary.total_kept += decisions
            .iter()
            .filter(|d| d.verdict == Verdict::Keep)
            .count() as u64;

        let outcomes = mutate::apply(client, kind, &decisions, &settings, retry).await;
        for outcome in &outcomes {
            match outcome.result {
                OutcomeKind::Succeeded => summary.total_deleted += 1,
                OutcomeKind::Failed => summary.total_failed += 1,
                OutcomeKind::SkippedDryRun => summary.total_dry_run += 1,
            }
        }
    }

    info!(
        scanned = summary.total_scanned,
        kept = summary.total_kept,
        deleted = summary.total_deleted,
        failed = summary.total_failed,
        dry_run = summary.total_dry_run,
        "cleanup run complete"
    );
    if summary.total_failed > 0 {
        warn!(
            failed = summary.total_failed,
            "some backups could not be deleted; see the log lines above"
        );
    }

    Ok(summary)
}

/// Run the tenancy inventory export.
pub async fn run_inventory(
    client: &dyn RemoteClient,
    config: &InventoryConfig,
    retry: &RetryConfig,
) -> Result<InventorySummary, RunError> {
    config.validate()?;

    let index = compartments::resolve_all(
        client,
        retry,
        &config.tenancy_id,
        config.include_inactive_compartments,
    )
    .await;

    let query = inventory::build_query(config);
    info!(query = %query, "searching resources");

    let source = SearchPages {
        client,
        query: &query,
    };
    let records: Vec<RemoteRecord> = fetch_all(&source, retry, "search_resources")
        .try_collect()
        .await?;

    if records.is_empty() {
        warn!("no resources found, skipping report");
        return Ok(InventorySummary {
            total_resources: 0,
            compartments_resolved: index.len() as u64,
            report_path: None,
        });
    }

    let path = config
        .output
        .clone()
        .unwrap_or_else(|| inventory::default_report_path(chrono::Utc::now()));
    inventory::write_report(&path, &records, &index)?;

    Ok(InventorySummary {
        total_resources: records.len() as u64,
        compartments_resolved: index.len() as u64,
        report_path: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::LifecycleState;

    /// Scripted remote with per-kind backup lists and recorded deletes.
    #[derive(Default)]
    struct FakeRemote {
        boot_backups: Vec<RemoteRecord>,
        block_backups: Vec<RemoteRecord>,
        resources: Vec<RemoteRecord>,
        failing_deletes: Vec<String>,
        deletes: Mutex<Vec<String>>,
        remote_calls: AtomicU32,
    }

    #[async_trait]
    impl RemoteClient for FakeRemote {
        async fn search_resources(
            &self,
            _query: &str,
            _page_token: Option<&str>,
        ) -> Result<Page, RemoteError> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                records: self.resources.clone(),
                next_token: None,
            })
        }

        async fn list_compartments(
            &self,
            _parent_id: &str,
            _page_token: Option<&str>,
        ) -> Result<Page, RemoteError> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page::default())
        }

        async fn get_tenancy(&self, tenancy_id: &str) -> Result<RemoteRecord, RemoteError> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteRecord::named(tenancy_id, "acme"))
        }

        async fn list_backups(
            &self,
            kind: BackupKind,
            _compartment_id: &str,
            _page_token: Option<&str>,
        ) -> Result<Page, RemoteError> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            let records = match kind {
                BackupKind::Boot => self.boot_backups.clone(),
                BackupKind::Block => self.block_backups.clone(),
            };
            Ok(Page {
                records,
                next_token: None,
            })
        }

        async fn delete_backup(
            &self,
            _kind: BackupKind,
            identifier: &str,
        ) -> Result<(), RemoteError> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            self.deletes.lock().unwrap().push(identifier.to_string());
            if self.failing_deletes.iter().any(|id| id == identifier) {
                return Err(RemoteError::Conflict("already terminating".to_string()));
            }
            Ok(())
        }
    }

    fn backup(id: &str, volume: &str, hour: u32, state: LifecycleState) -> RemoteRecord {
        RemoteRecord {
            parent_id: Some(volume.to_string()),
            time_created: Some(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()),
            lifecycle_state: state,
            ..RemoteRecord::named(id, format!("backup-{id}"))
        }
    }

    fn cleanup_config(keep: u32, dry_run: bool) -> CleanupConfig {
        CleanupConfig {
            compartment_id: "ocid1.compartment.oc1..test".to_string(),
            keep_count: keep,
            dry_run,
            block_only: true,
            pacing_ms: 0,
            ..Default::default()
        }
    }

    fn retry() -> RetryConfig {
        RetryConfig {
            max_retries: 0,
            initial_delay_ms: 1,
            jitter: 0.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cleanup_deletes_excess_and_counts() {
        let client = FakeRemote {
            block_backups: vec![
                backup("b1", "v1", 3, LifecycleState::Available),
                backup("b2", "v1", 2, LifecycleState::Available),
                backup("b3", "v1", 1, LifecycleState::Available),
                backup("b4", "v2", 1, LifecycleState::Available),
            ],
            ..Default::default()
        };

        let summary = run_cleanup(&client, &cleanup_config(2, false), &retry())
            .await
            .unwrap();

        assert_eq!(summary.total_scanned, 4);
        assert_eq!(summary.total_kept, 3);
        assert_eq!(summary.total_deleted, 1);
        assert_eq!(summary.total_failed, 0);
        assert_eq!(*client.deletes.lock().unwrap(), vec!["b3".to_string()]);
    }

    #[tokio::test]
    async fn non_available_backups_are_filtered_not_deleted() {
        let client = FakeRemote {
            block_backups: vec![
                backup("b1", "v1", 3, LifecycleState::Available),
                backup("b2", "v1", 2, LifecycleState::Terminating),
                backup("b3", "v1", 1, LifecycleState::Faulty),
            ],
            ..Default::default()
        };

        let summary = run_cleanup(&client, &cleanup_config(1, false), &retry())
            .await
            .unwrap();

        // scanned counts everything, but only the AVAILABLE backup is grouped
        assert_eq!(summary.total_scanned, 3);
        assert_eq!(summary.total_kept, 1);
        assert_eq!(summary.total_deleted, 0);
        assert!(client.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_counts_without_deleting() {
        let client = FakeRemote {
            block_backups: vec![
                backup("b1", "v1", 3, LifecycleState::Available),
                backup("b2", "v1", 2, LifecycleState::Available),
                backup("b3", "v1", 1, LifecycleState::Available),
            ],
            ..Default::default()
        };

        let summary = run_cleanup(&client, &cleanup_config(1, true), &retry())
            .await
            .unwrap();

        assert_eq!(summary.total_dry_run, 2);
        assert_eq!(summary.total_deleted, 0);
        assert!(client.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_is_counted_not_fatal() {
        let client = FakeRemote {
            block_backups: vec![
                backup("b1", "v1", 3, LifecycleState::Available),
                backup("b2", "v1", 2, LifecycleState::Available),
                backup("b3", "v1", 1, LifecycleState::Available),
            ],
            failing_deletes: vec!["b2".to_string()],
            ..Default::default()
        };

        let summary = run_cleanup(&client, &cleanup_config(1, false), &retry())
            .await
            .unwrap();

        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.total_deleted, 1);
        // both deletes were attempted despite the failure
        assert_eq!(client.deletes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_retention_fails_before_any_fetch() {
        let client = FakeRemote::default();

        let err = run_cleanup(&client, &cleanup_config(0, false), &retry())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::InvalidRetention(0))
        ));
        assert_eq!(client.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn both_kinds_processed_without_scope_flags() {
        let client = FakeRemote {
            boot_backups: vec![
                backup("boot-1", "bv1", 2, LifecycleState::Available),
                backup("boot-2", "bv1", 1, LifecycleState::Available),
            ],
            block_backups: vec![
                backup("blk-1", "v1", 2, LifecycleState::Available),
                backup("blk-2", "v1", 1, LifecycleState::Available),
            ],
            ..Default::default()
        };
        let config = CleanupConfig {
            block_only: false,
            ..cleanup_config(1, false)
        };

        let summary = run_cleanup(&client, &config, &retry()).await.unwrap();

        assert_eq!(summary.total_scanned, 4);
        assert_eq!(summary.total_deleted, 2);
        let deletes = client.deletes.lock().unwrap();
        assert!(deletes.contains(&"boot-2".to_string()));
        assert!(deletes.contains(&"blk-2".to_string()));
    }

    #[tokio::test]
    async fn orphan_backups_survive_cleanup() {
        let mut orphan = backup("o1", "ignored", 1, LifecycleState::Available);
        orphan.parent_id = None;
        let client = FakeRemote {
            block_backups: vec![
                orphan,
                backup("b1", "v1", 2, LifecycleState::Available),
                backup("b2", "v1", 1, LifecycleState::Available),
            ],
            ..Default::default()
        };

        let summary = run_cleanup(&client, &cleanup_config(1, false), &retry())
            .await
            .unwrap();

        assert_eq!(summary.total_kept, 2);
        assert_eq!(*client.deletes.lock().unwrap(), vec!["b2".to_string()]);
    }

    #[tokio::test]
    async fn inventory_writes_report_with_compartment_names() {
        let mut resource = RemoteRecord::named("ocid1.instance.oc1..a", "web-01");
        resource.resource_type = "Instance".to_string();
        resource.compartment_id = "root".to_string();
        let client = FakeRemote {
            resources: vec![resource],
            ..Default::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let config = InventoryConfig {
            tenancy_id: "root".to_string(),
            output: Some(output.clone()),
            ..Default::default()
        };

        let summary = run_inventory(&client, &config, &retry()).await.unwrap();

        assert_eq!(summary.total_resources, 1);
        assert_eq!(summary.report_path, Some(output.clone()));
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.contains("web-01"));
        assert!(contents.contains("acme")); // compartment resolved to tenancy name
    }

    #[tokio::test]
    async fn inventory_with_no_resources_skips_report() {
        let client = FakeRemote::default();
        let config = InventoryConfig {
            tenancy_id: "root".to_string(),
            ..Default::default()
        };

        let summary = run_inventory(&client, &config, &retry()).await.unwrap();

        assert_eq!(summary.total_resources, 0);
        assert!(summary.report_path.is_none());
    }

    #[tokio::test]
    async fn inventory_requires_tenancy() {
        let client = FakeRemote::default();
        let config = InventoryConfig::default();

        let err = run_inventory(&client, &config, &retry()).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Config(ConfigError::MissingTenancy)
        ));
    }
}
