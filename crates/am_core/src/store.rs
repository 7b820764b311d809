use crate::app_error::AppResult;
use crate::types::{MessageId, MessageRecord, PartyRecord, ThreadId, ThreadRecord};

/// Row selection over `messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFilter {
    All,
    WithoutThread,
    WithoutAuthor,
    InThread(ThreadId),
}

impl MessageFilter {
    pub fn matches(&self, message: &MessageRecord) -> bool {
        match self {
            MessageFilter::All => true,
            MessageFilter::WithoutThread => message.thread_id.is_none(),
            MessageFilter::WithoutAuthor => message
                .author
                .as_deref()
                .map(str::is_empty)
                .unwrap_or(true),
            MessageFilter::InThread(thread_id) => message.thread_id == Some(*thread_id),
        }
    }
}

/// Access to one archive.
///
/// Writes go into the transaction opened by [`RecordStore::begin`] and only
/// become durable on [`RecordStore::commit`]. Rows are returned in local id
/// order.
pub trait RecordStore {
    fn parties(&self) -> AppResult<Vec<PartyRecord>>;
    fn threads(&self) -> AppResult<Vec<ThreadRecord>>;
    fn messages_where(&self, filter: MessageFilter) -> AppResult<Vec<MessageRecord>>;

    fn messages(&self) -> AppResult<Vec<MessageRecord>> {
        self.messages_where(MessageFilter::All)
    }

    fn insert_party(&mut self, row: &PartyRecord) -> AppResult<i64>;
    fn insert_thread(&mut self, row: &ThreadRecord) -> AppResult<ThreadId>;
    fn insert_message(&mut self, row: &MessageRecord) -> AppResult<MessageId>;

    fn begin(&mut self) -> AppResult<()>;
    fn commit(&mut self) -> AppResult<()>;
    fn rollback(&mut self) -> AppResult<()>;
}
