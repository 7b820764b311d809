//! Target-side message index.
//!
//! Messages are grouped into buckets by fingerprint (thread, author, body,
//! kind); inside a bucket they are keyed by their resolved secondary key.

use crate::app_error::{AppError, AppResult};
use crate::types::{KeyOrigin, MessageId, MessageRecord, SecondaryKey, ThreadId};
use std::collections::HashMap;

pub const PROGRESS_INTERVAL: usize = 250;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    pub thread_id: ThreadId,
    pub author: Option<String>,
    pub body: Option<String>,
    pub kind: Option<i64>,
}

impl Fingerprint {
    /// `thread_id` must already be expressed in the target's id space.
    pub fn of(message: &MessageRecord, thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            author: message.author.clone(),
            body: message.body.clone(),
            kind: message.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: MessageId,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Bucket {
    entries: HashMap<SecondaryKey, IndexEntry>,
}

impl Bucket {
    pub fn probe(&self, key: &SecondaryKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Smallest absolute timestamp distance between `timestamp` and any entry.
    pub fn closest_gap(&self, timestamp: i64) -> Option<i64> {
        self.entries
            .values()
            .map(|entry| (entry.timestamp - timestamp).abs())
            .min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    buckets: HashMap<Fingerprint, Bucket>,
    message_count: usize,
}

impl FingerprintIndex {
    /// Fails when two target messages share a fingerprint and a resolved
    /// key: the target already holds duplicates and no match can be trusted.
    pub fn build<I>(target_messages: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = MessageRecord>,
    {
        let mut index = Self::default();
        for message in target_messages {
            let thread_id = message.thread_id.ok_or_else(|| {
                AppError::integrity(
                    "AM_ORPHAN_MESSAGE",
                    "target message has no thread reference",
                    serde_json::json!({ "side": "target", "message_id": message.id.0 }),
                )
            })?;
            let fingerprint = Fingerprint::of(&message, thread_id);
            let key = SecondaryKey::resolve(&message, KeyOrigin::Target);
            let entry = IndexEntry {
                id: message.id,
                timestamp: message.timestamp,
            };

            let bucket = index.buckets.entry(fingerprint).or_default();
            if let Some(existing) = bucket.entries.insert(key, entry) {
                return Err(AppError::integrity(
                    "AM_INDEX_DUPLICATE_KEY",
                    "target archive already holds two messages with the same fingerprint and key",
                    serde_json::json!({
                        "key": key.to_string(),
                        "message_ids": [existing.id.0, message.id.0],
                        "thread_id": thread_id.0,
                    }),
                ));
            }

            index.message_count += 1;
            if index.message_count % PROGRESS_INTERVAL == 0 {
                tracing::debug!(messages = index.message_count, "indexing target messages");
            }
        }

        tracing::info!(
            messages = index.message_count,
            buckets = index.buckets.len(),
            "target messages indexed"
        );
        Ok(index)
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&Bucket> {
        self.buckets.get(fingerprint)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }
}
