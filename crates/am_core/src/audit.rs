use crate::types::{MessageId, MessageRecord, SecondaryKey, ThreadId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Novel-key message suspiciously close in time to a message with the same
/// fingerprint. Inserted as new; kept here for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseCall {
    pub source_message_id: MessageId,
    pub thread_id: ThreadId,
    pub author: Option<String>,
    pub body: Option<String>,
    pub kind: Option<i64>,
    pub key: SecondaryKey,
    pub timestamp: i64,
    pub closest_gap_secs: i64,
}

impl CloseCall {
    pub fn new(
        message: &MessageRecord,
        thread_id: ThreadId,
        key: SecondaryKey,
        closest_gap_secs: i64,
    ) -> Self {
        Self {
            source_message_id: message.id,
            thread_id,
            author: message.author.clone(),
            body: message.body.clone(),
            kind: message.kind,
            key,
            timestamp: message.timestamp,
            closest_gap_secs,
        }
    }
}

/// Duplicate matched on key whose timestamps disagree beyond the leeway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampWarning {
    pub source_message_id: MessageId,
    pub target_message_id: MessageId,
    pub source_timestamp: i64,
    pub target_timestamp: i64,
    pub gap_secs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAudit {
    pub schema_version: i64,
    pub pretend: bool,
    pub parties_added: usize,
    pub threads_added: usize,
    pub checked: usize,
    pub added: usize,
    pub duplicates: usize,
    pub new_fingerprint: usize,
    pub new_secondary_key: usize,
    /// Source messages repeating a fingerprint and key already queued for
    /// insert in this run. Counted as duplicates.
    pub source_repeats: usize,
    /// Minimum gap over all novel-key cases, `None` when there were none.
    pub closest_gap_secs: Option<i64>,
    pub close_calls: Vec<CloseCall>,
    pub timestamp_warnings: Vec<TimestampWarning>,
}

impl MergeAudit {
    pub fn new(pretend: bool) -> Self {
        Self {
            schema_version: 1,
            pretend,
            ..Default::default()
        }
    }

    pub fn record_duplicate(&mut self) {
        self.checked += 1;
        self.duplicates += 1;
    }

    pub fn record_source_repeat(&mut self) {
        self.source_repeats += 1;
        self.record_duplicate();
    }

    pub fn record_new_fingerprint(&mut self) {
        self.checked += 1;
        self.added += 1;
        self.new_fingerprint += 1;
    }

    pub fn record_new_secondary_key(&mut self, closest_gap_secs: Option<i64>) {
        self.checked += 1;
        self.added += 1;
        self.new_secondary_key += 1;
        if let Some(gap) = closest_gap_secs {
            self.closest_gap_secs = Some(match self.closest_gap_secs {
                Some(current) => current.min(gap),
                None => gap,
            });
        }
    }

    pub fn record_close_call(&mut self, close_call: CloseCall) {
        self.close_calls.push(close_call);
    }

    pub fn record_timestamp_warning(&mut self, warning: TimestampWarning) {
        self.timestamp_warnings.push(warning);
    }

    /// Every checked message ended either as an insert or as a duplicate.
    pub fn is_balanced(&self) -> bool {
        self.checked == self.added + self.duplicates
            && self.added == self.new_fingerprint + self.new_secondary_key
    }
}

impl fmt::Display for MergeAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} contacts added, {} conversations added.",
            self.parties_added, self.threads_added
        )?;
        writeln!(
            f,
            "{} messages read, {} messages added.",
            self.checked, self.added
        )?;
        let closest = self
            .closest_gap_secs
            .map(|gap| gap.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "{} new fingerprints, {} new remote ids, {} close calls ({} seconds closest), {} timestamp warnings",
            self.new_fingerprint,
            self.new_secondary_key,
            self.close_calls.len(),
            closest,
            self.timestamp_warnings.len()
        )?;
        for call in &self.close_calls {
            write!(
                f,
                "\n  close call: message {} in thread {} ({}, {} s from nearest)",
                call.source_message_id, call.thread_id, call.key, call.closest_gap_secs
            )?;
        }
        Ok(())
    }
}
