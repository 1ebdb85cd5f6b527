//! Execution of delete decisions with bounded retry and failure isolation.
//!
//! One stuck backup never halts the batch: an exhausted-retry or permanent
//! failure is recorded as a FAILED outcome and the batch continues. Dry-run
//! mode records what would happen without any remote call.

use std::time::Duration;

use tracing::{error, info};

use crate::config::RetryConfig;
use crate::model::BackupKind;
use crate::remote::retry::with_retry;
use crate::remote::{RemoteClient, RemoteError};
use crate::retention::{RetentionDecision, Verdict};

/// How the mutator treats the batch.
#[derive(Debug, Clone)]
pub struct ApplySettings {
    /// Record deletions without calling the remote API.
    pub dry_run: bool,
    /// Sleep between successive delete calls. Zero disables pacing.
    pub pacing: Duration,
}

/// Result of one delete operation.
#[derive(Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
    SkippedDryRun,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::SkippedDryRun => "skipped (dry run)",
        };
        f.write_str(s)
    }
}

/// Per-record operation outcome, consumed by the run summary. Outcomes are
/// never retried across runs.
#[derive(Debug)]
pub struct OperationOutcome {
    pub identifier: String,
    pub display_name: String,
    /// Remote calls made for this record; 0 in dry-run mode.
    pub attempts: u32,
    pub result: OutcomeKind,
    pub last_error: Option<RemoteError>,
}

/// Execute the DELETE decisions of a batch. KEEP decisions produce no call.
///
/// Returns one outcome per DELETE decision, in input order, regardless of
/// individual failures.
pub async fn apply(
    client: &dyn RemoteClient,
    kind: BackupKind,
    decisions: &[RetentionDecision],
    settings: &ApplySettings,
    retry: &RetryConfig,
) -> Vec<OperationOutcome> {
    let mut outcomes = Vec::new();

    for decision in decisions {
        if decision.verdict != Verdict::Delete {
            continue;
        }
        let record = &decision.record;

        if settings.dry_run {
            info!(
                kind = %kind,
                backup = %record.identifier,
                name = %record.display_name,
                "DRY RUN: would delete backup"
            );
            outcomes.push(OperationOutcome {
                identifier: record.identifier.clone(),
                display_name: record.display_name.clone(),
                attempts: 0,
                result: OutcomeKind::SkippedDryRun,
                last_error: None,
            });
            continue;
        }

        let outcome = match with_retry(retry, "delete_backup", || {
            client.delete_backup(kind, &record.identifier)
        })
        .await
        {
            Ok(((), attempts)) => {
                info!(
                    kind = %kind,
                    backup = %record.identifier,
                    name = %record.display_name,
                    attempts = attempts,
                    "deleted backup"
                );
                OperationOutcome {
                    identifier: record.identifier.clone(),
                    display_name: record.display_name.clone(),
                    attempts,
                    result: OutcomeKind::Succeeded,
                    last_error: None,
                }
            }
            Err(e) => {
                error!(
                    kind = %kind,
                    backup = %record.identifier,
                    name = %record.display_name,
                    attempts = e.attempts,
                    error = %e.error,
                    "failed to delete backup, continuing with batch"
                );
                OperationOutcome {
                    identifier: record.identifier.clone(),
                    display_name: record.display_name.clone(),
                    attempts: e.attempts,
                    result: OutcomeKind::Failed,
                    last_error: Some(e.error),
                }
            }
        };
        outcomes.push(outcome);

        if !settings.pacing.is_zero() {
            tokio::time::sleep(settings.pacing).await;
        }
    }

    outcomes
}
