use crate::app_error::{AppError, AppResult};
use crate::types::{PartyRecord, ThreadId, ThreadRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Source-local thread id to target-local thread id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadIdMap {
    entries: BTreeMap<ThreadId, ThreadId>,
}

impl ThreadIdMap {
    pub fn translate(&self, source: ThreadId) -> Option<ThreadId> {
        self.entries.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ThreadId, ThreadId)> for ThreadIdMap {
    fn from_iter<I: IntoIterator<Item = (ThreadId, ThreadId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Source parties whose handle the target does not know yet. Existing target
/// rows always win; a handle repeated in the source is emitted once.
pub fn reconcile_parties(source: &[PartyRecord], target: &[PartyRecord]) -> Vec<PartyRecord> {
    let mut known: BTreeSet<&str> = target.iter().map(|p| p.skypename.as_str()).collect();
    let mut out = Vec::new();
    for party in source {
        if known.insert(party.skypename.as_str()) {
            tracing::debug!(skypename = %party.skypename, "new party");
            out.push(party.clone());
        }
    }
    out
}

/// Source threads whose identity the target does not know yet.
pub fn reconcile_threads(source: &[ThreadRecord], target: &[ThreadRecord]) -> Vec<ThreadRecord> {
    let mut known: BTreeSet<&str> = target.iter().map(|t| t.identity.as_str()).collect();
    let mut out = Vec::new();
    for thread in source {
        if known.insert(thread.identity.as_str()) {
            tracing::debug!(identity = %thread.identity, "new thread");
            out.push(thread.clone());
        }
    }
    out
}

/// Joins source and target threads on identity. `target` must be re-read
/// after the new threads were inserted.
pub fn build_thread_id_map(
    source: &[ThreadRecord],
    target: &[ThreadRecord],
) -> AppResult<ThreadIdMap> {
    let mut by_identity: BTreeMap<&str, ThreadId> = BTreeMap::new();
    for thread in target {
        if let Some(existing) = by_identity.insert(thread.identity.as_str(), thread.id) {
            return Err(AppError::integrity(
                "AM_THREAD_IDENTITY_DUPLICATE",
                "target archive holds two threads with the same identity",
                serde_json::json!({
                    "identity": thread.identity,
                    "thread_ids": [existing.0, thread.id.0],
                }),
            ));
        }
    }

    let mut entries = BTreeMap::new();
    for thread in source {
        let target_id = by_identity.get(thread.identity.as_str()).ok_or_else(|| {
            AppError::integrity(
                "AM_THREAD_UNRESOLVED",
                "source thread has no target counterpart after reconciliation",
                serde_json::json!({
                    "identity": thread.identity,
                    "source_thread_id": thread.id.0,
                }),
            )
        })?;
        entries.insert(thread.id, *target_id);
    }

    Ok(ThreadIdMap { entries })
}
