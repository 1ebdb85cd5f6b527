//! Retention grouping and the keep-newest-N decision.
//!
//! Backups are partitioned by parent volume, sorted newest-first, and
//! classified into KEEP / DELETE. The decision is a pure function of its
//! inputs: the sort order is total (creation time descending, identifier
//! ascending on ties), so two runs over the same records produce identical
//! decisions.

use std::collections::BTreeMap;

use crate::model::RemoteRecord;

/// Group key for retention: the parent volume, or a synthetic orphan bucket
/// for backups whose parent id is absent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Volume(String),
    Orphan,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Volume(id) => f.write_str(id),
            Self::Orphan => f.write_str("(orphaned)"),
        }
    }
}

/// KEEP or DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Delete,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => f.write_str("KEEP"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// Why a record got its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Among the newest N of its group.
    WithinRetention,
    /// Older than the newest N of its group.
    ExceedsRetention,
    /// Parent volume unknown; deleting backups for an unknown parent is
    /// unsafe, so these are always kept.
    OrphanedParent,
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WithinRetention => "within retention window",
            Self::ExceedsRetention => "exceeds retention window",
            Self::OrphanedParent => "parent volume unknown",
        };
        f.write_str(s)
    }
}

/// One record's retention decision.
#[derive(Debug, Clone)]
pub struct RetentionDecision {
    pub record: RemoteRecord,
    pub verdict: Verdict,
    pub reason: DecisionReason,
}

/// Partition records by parent volume id. `BTreeMap` keeps group iteration
/// order deterministic across runs.
pub fn group_by_volume(records: Vec<RemoteRecord>) -> BTreeMap<GroupKey, Vec<RemoteRecord>> {
    let mut groups: BTreeMap<GroupKey, Vec<RemoteRecord>> = BTreeMap::new();
    for record in records {
        let key = match &record.parent_id {
            Some(parent) => GroupKey::Volume(parent.clone()),
            None => GroupKey::Orphan,
        };
        groups.entry(key).or_default().push(record);
    }
    groups
}

/// Decide KEEP / DELETE for one group, keeping the newest `keep_count`.
///
/// `keep_count >= 1` is enforced at configuration time; a group is never
/// emptied. Orphans are always kept regardless of group size.
pub fn decide(
    key: &GroupKey,
    mut records: Vec<RemoteRecord>,
    keep_count: usize,
) -> Vec<RetentionDecision> {
    // Newest first; records without a timestamp sort oldest. Identifier
    // breaks ties so the order is total.
    records.sort_by(|a, b| {
        b.time_created
            .cmp(&a.time_created)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let (verdict, reason) = if *key == GroupKey::Orphan {
                (Verdict::Keep, DecisionReason::OrphanedParent)
            } else if index < keep_count {
                (Verdict::Keep, DecisionReason::WithinRetention)
            } else {
                (Verdict::Delete, DecisionReason::ExceedsRetention)
            };
            RetentionDecision {
                record,
                verdict,
                reason,
            }
        })
        .collect()
}
