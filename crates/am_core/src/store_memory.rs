use crate::app_error::{AppError, AppResult};
use crate::store::{MessageFilter, RecordStore};
use crate::types::{MessageId, MessageRecord, PartyRecord, ThreadId, ThreadRecord};

#[derive(Debug, Clone, Default, PartialEq)]
struct Tables {
    parties: Vec<PartyRecord>,
    threads: Vec<ThreadRecord>,
    messages: Vec<MessageRecord>,
}

/// In-memory archive. Rows seeded through the `with_*` builders keep their
/// ids; inserted rows get the next free id of their table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshot: Option<Tables>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_party(mut self, party: PartyRecord) -> Self {
        self.tables.parties.push(party);
        self
    }

    pub fn with_thread(mut self, thread: ThreadRecord) -> Self {
        self.tables.threads.push(thread);
        self
    }

    pub fn with_message(mut self, message: MessageRecord) -> Self {
        self.tables.messages.push(message);
        self
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn require_transaction(&self, table: &str) -> AppResult<()> {
        if self.snapshot.is_none() {
            return Err(AppError::store(
                "AM_STORE_NO_TRANSACTION",
                "insert attempted outside of a transaction",
                serde_json::json!({ "table": table }),
            ));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn parties(&self) -> AppResult<Vec<PartyRecord>> {
        let mut rows = self.tables.parties.clone();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn threads(&self) -> AppResult<Vec<ThreadRecord>> {
        let mut rows = self.tables.threads.clone();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn messages_where(&self, filter: MessageFilter) -> AppResult<Vec<MessageRecord>> {
        let mut rows: Vec<MessageRecord> = self
            .tables
            .messages
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn insert_party(&mut self, row: &PartyRecord) -> AppResult<i64> {
        self.require_transaction("contacts")?;
        let id = self.tables.parties.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        self.tables.parties.push(PartyRecord { id, ..row.clone() });
        Ok(id)
    }

    fn insert_thread(&mut self, row: &ThreadRecord) -> AppResult<ThreadId> {
        self.require_transaction("conversations")?;
        let id = ThreadId(
            self.tables
                .threads
                .iter()
                .map(|t| t.id.0)
                .max()
                .unwrap_or(0)
                + 1,
        );
        self.tables.threads.push(ThreadRecord { id, ..row.clone() });
        Ok(id)
    }

    fn insert_message(&mut self, row: &MessageRecord) -> AppResult<MessageId> {
        self.require_transaction("messages")?;
        let id = MessageId(
            self.tables
                .messages
                .iter()
                .map(|m| m.id.0)
                .max()
                .unwrap_or(0)
                + 1,
        );
        self.tables.messages.push(MessageRecord { id, ..row.clone() });
        Ok(id)
    }

    fn begin(&mut self) -> AppResult<()> {
        if self.snapshot.is_some() {
            return Err(AppError::store(
                "AM_STORE_TRANSACTION_FAILED",
                "transaction already open",
                serde_json::json!({}),
            ));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> AppResult<()> {
        if self.snapshot.take().is_none() {
            return Err(AppError::store(
                "AM_STORE_TRANSACTION_FAILED",
                "commit without an open transaction",
                serde_json::json!({}),
            ));
        }
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> AppResult<()> {
        match self.snapshot.take() {
            Some(tables) => {
                self.tables = tables;
                Ok(())
            }
            None => Err(AppError::store(
                "AM_STORE_TRANSACTION_FAILED",
                "rollback without an open transaction",
                serde_json::json!({}),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_restores_rows_seen_before_begin() {
        let mut store = MemoryStore::new().with_party(PartyRecord {
            id: 7,
            skypename: "alice".to_string(),
            ..Default::default()
        });

        store.begin().expect("begin");
        let id = store
            .insert_party(&PartyRecord {
                skypename: "bob".to_string(),
                ..Default::default()
            })
            .expect("insert");
        assert_eq!(id, 8);
        assert_eq!(store.parties().expect("parties").len(), 2);

        store.rollback().expect("rollback");
        assert_eq!(store.parties().expect("parties").len(), 1);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn insert_outside_transaction_is_rejected() {
        let mut store = MemoryStore::new();
        let err = store
            .insert_message(&MessageRecord::default())
            .expect_err("no transaction");
        assert_eq!(err.code, "AM_STORE_NO_TRANSACTION");
    }
}
