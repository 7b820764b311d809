use crate::app_error::{AppError, AppResult};
use crate::store::{MessageFilter, RecordStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityReport {
    pub parties: usize,
    pub threads: usize,
    pub messages: usize,
}

pub fn assert_no_threadless_messages<S: RecordStore + ?Sized>(store: &S, side: &str) -> AppResult<()> {
    let orphans = store.messages_where(MessageFilter::WithoutThread)?;
    if let Some(first) = orphans.first() {
        return Err(AppError::integrity(
            "AM_ORPHAN_MESSAGE",
            "archive holds a message without a thread reference",
            serde_json::json!({
                "side": side,
                "message_id": first.id.0,
                "count": orphans.len(),
            }),
        ));
    }
    Ok(())
}

pub fn assert_no_authorless_messages<S: RecordStore + ?Sized>(store: &S, side: &str) -> AppResult<()> {
    let authorless = store.messages_where(MessageFilter::WithoutAuthor)?;
    if let Some(first) = authorless.first() {
        return Err(AppError::integrity(
            "AM_AUTHORLESS_MESSAGE",
            "archive holds a message without an author",
            serde_json::json!({
                "side": side,
                "message_id": first.id.0,
                "count": authorless.len(),
            }),
        ));
    }
    Ok(())
}

/// Verifies the assumptions the merge and downstream export make about an
/// archive.
pub fn check_archive<S: RecordStore + ?Sized>(store: &S, side: &str) -> AppResult<SanityReport> {
    assert_no_threadless_messages(store, side)?;
    assert_no_authorless_messages(store, side)?;

    let report = SanityReport {
        parties: store.parties()?.len(),
        threads: store.threads()?.len(),
        messages: store.messages()?.len(),
    };
    tracing::info!(
        side,
        parties = report.parties,
        threads = report.threads,
        messages = report.messages,
        "archive sanity checks passed"
    );
    Ok(report)
}
