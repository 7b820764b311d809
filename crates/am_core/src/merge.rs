//! Message classification.
//!
//! Fields a message carries that are safe to match on: thread, author, body
//! and kind. Any change in one of them makes it a different message. The
//! same author can legally post the same body twice in one thread, so the
//! remote correlation id is consulted to tell such messages apart.
//!
//! The remote id is set by whichever machine first received the message and
//! usually travels with it, but it is not unique (relays differ, counters
//! restart after reinstalls), is occasionally null, and rare message pairs
//! share it while differing in kind. Timestamps drift by tens of seconds
//! between machines, by hours with a misconfigured zone, and arbitrarily
//! with a wrong clock, so they are used only for safety checks.
//!
//! Strategy: bucket by fingerprint, pick the entry with the same key, and
//! treat a key miss as a new message unless an entry is suspiciously close in
//! time, in which case it is still inserted but flagged for review.

use crate::app_error::{AppError, AppResult};
use crate::audit::{CloseCall, MergeAudit, TimestampWarning};
use crate::config::MergeConfig;
use crate::fingerprint::{Fingerprint, FingerprintIndex, PROGRESS_INTERVAL};
use crate::identity::ThreadIdMap;
use crate::types::{KeyOrigin, MessageId, MessageRecord, SecondaryKey, ThreadId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Classification {
    /// Same fingerprint and key as a target message.
    Duplicate {
        target_message_id: MessageId,
        target_timestamp: i64,
        gap_secs: i64,
    },
    /// Same fingerprint and key as an earlier source message already queued
    /// for insert in this run.
    RepeatedInSource { first_source_message_id: MessageId },
    /// No target message shares the fingerprint.
    NewFingerprint,
    /// The fingerprint is known but no entry carries this key.
    NewSecondaryKey { closest_gap_secs: Option<i64> },
}

impl Classification {
    pub fn is_new(&self) -> bool {
        matches!(
            self,
            Classification::NewFingerprint | Classification::NewSecondaryKey { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Rows to append to the target, in source order.
    pub inserts: Vec<MessageRecord>,
    pub audit: MergeAudit,
}

pub struct MergeEngine<'a> {
    index: &'a FingerprintIndex,
    threads: &'a ThreadIdMap,
    config: &'a MergeConfig,
}

impl<'a> MergeEngine<'a> {
    pub fn new(index: &'a FingerprintIndex, threads: &'a ThreadIdMap, config: &'a MergeConfig) -> Self {
        Self {
            index,
            threads,
            config,
        }
    }

    pub fn translate(&self, message: &MessageRecord) -> AppResult<ThreadId> {
        let source_thread = message.thread_id.ok_or_else(|| {
            AppError::integrity(
                "AM_ORPHAN_MESSAGE",
                "source message has no thread reference",
                serde_json::json!({ "side": "source", "message_id": message.id.0 }),
            )
        })?;
        self.threads.translate(source_thread).ok_or_else(|| {
            AppError::integrity(
                "AM_THREAD_UNTRANSLATED",
                "source message references a thread missing from the id map",
                serde_json::json!({
                    "message_id": message.id.0,
                    "source_thread_id": source_thread.0,
                }),
            )
        })
    }

    /// Probes the target index only; repeats within the source are handled
    /// by [`MergeEngine::merge`].
    pub fn classify(&self, fingerprint: &Fingerprint, key: &SecondaryKey, timestamp: i64) -> Classification {
        let Some(bucket) = self.index.lookup(fingerprint) else {
            return Classification::NewFingerprint;
        };
        match bucket.probe(key) {
            Some(hit) => Classification::Duplicate {
                target_message_id: hit.id,
                target_timestamp: hit.timestamp,
                gap_secs: (hit.timestamp - timestamp).abs(),
            },
            None => Classification::NewSecondaryKey {
                closest_gap_secs: bucket.closest_gap(timestamp),
            },
        }
    }

    /// Classifies every source message. Nothing is written; the caller
    /// applies `inserts` once the whole batch classified without error.
    pub fn merge(&self, source_messages: &[MessageRecord]) -> AppResult<MergeOutcome> {
        let mut audit = MergeAudit::new(self.config.pretend);
        let mut inserts = Vec::new();
        let mut queued: HashMap<(Fingerprint, SecondaryKey), MessageId> = HashMap::new();

        for message in source_messages {
            let thread_id = self.translate(message)?;
            let fingerprint = Fingerprint::of(message, thread_id);
            let key = SecondaryKey::resolve(message, KeyOrigin::Source);

            let mut classification = self.classify(&fingerprint, &key, message.timestamp);
            let queue_key = (fingerprint, key);
            if classification.is_new() {
                if let Some(first) = queued.get(&queue_key) {
                    classification = Classification::RepeatedInSource {
                        first_source_message_id: *first,
                    };
                }
            }

            match classification {
                Classification::Duplicate {
                    target_message_id,
                    target_timestamp,
                    gap_secs,
                } => {
                    audit.record_duplicate();
                    if gap_secs > self.config.timestamp_leeway_secs {
                        tracing::warn!(
                            source_message_id = message.id.0,
                            target_message_id = target_message_id.0,
                            gap_secs,
                            "faulty remote id match suspected, timestamps differ"
                        );
                        audit.record_timestamp_warning(TimestampWarning {
                            source_message_id: message.id,
                            target_message_id,
                            source_timestamp: message.timestamp,
                            target_timestamp,
                            gap_secs,
                        });
                    }
                }
                Classification::RepeatedInSource {
                    first_source_message_id,
                } => {
                    tracing::debug!(
                        source_message_id = message.id.0,
                        first_source_message_id = first_source_message_id.0,
                        "source repeats a queued message"
                    );
                    audit.record_source_repeat();
                }
                Classification::NewFingerprint => {
                    audit.record_new_fingerprint();
                    inserts.push(insert_row(message, thread_id));
                    queued.insert(queue_key, message.id);
                }
                Classification::NewSecondaryKey { closest_gap_secs } => {
                    audit.record_new_secondary_key(closest_gap_secs);
                    if let Some(gap) = closest_gap_secs {
                        if gap < self.config.close_call_window_secs {
                            tracing::warn!(
                                source_message_id = message.id.0,
                                thread_id = thread_id.0,
                                gap_secs = gap,
                                "close call: same content under a different remote id"
                            );
                            audit.record_close_call(CloseCall::new(message, thread_id, key, gap));
                        }
                    }
                    inserts.push(insert_row(message, thread_id));
                    queued.insert(queue_key, message.id);
                }
            }

            if audit.checked % PROGRESS_INTERVAL == 0 {
                tracing::debug!(checked = audit.checked, added = audit.added, "checking source messages");
            }
        }

        tracing::info!(
            checked = audit.checked,
            added = audit.added,
            new_fingerprint = audit.new_fingerprint,
            new_secondary_key = audit.new_secondary_key,
            close_calls = audit.close_calls.len(),
            "source messages classified"
        );
        Ok(MergeOutcome { inserts, audit })
    }
}

/// Target row for a new message. A message without a remote id gets its own
/// source-local id as remote id, recorded as synthesized so a re-merge of the
/// same source resolves it to the same key.
pub fn insert_row(message: &MessageRecord, thread_id: ThreadId) -> MessageRecord {
    let mut row = message.clone();
    row.thread_id = Some(thread_id);
    match (row.remote_id, row.synthesized_from) {
        (None, None) => {
            row.remote_id = Some(message.id.0);
            row.synthesized_from = Some(message.id.0);
        }
        (None, Some(from)) => row.remote_id = Some(from),
        _ => {}
    }
    row
}
