use crate::app_error::{AppError, AppResult};
use crate::db::{open_archive, table_exists, OpenMode};
use crate::schema::{contacts, conversations, key_provenance, messages};
use crate::store::{MessageFilter, RecordStore};
use crate::types::{MessageId, MessageRecord, PartyRecord, ThreadId, ThreadRecord};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::{Path, PathBuf};

/// [`RecordStore`] over a SQLite archive file.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    in_transaction: bool,
}

fn store_error(code: &str, message: &str, table: &str, e: rusqlite::Error) -> AppError {
    AppError::store(
        code,
        message,
        serde_json::json!({ "error": e.to_string(), "table": table }),
    )
}

// Cells are read in their declared storage class only. A value stored under
// another class, or text that is not valid UTF-8, fails the row instead of
// being coerced: merged rows must be written back byte for byte, and
// fingerprints must not collapse distinct bodies.
fn opt_text(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<String>> {
    row.get::<_, Option<String>>(column)
}

fn opt_int(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<i64>> {
    row.get::<_, Option<i64>>(column)
}

fn opt_blob(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Vec<u8>>> {
    row.get::<_, Option<Vec<u8>>>(column)
}

fn req_int(row: &Row<'_>, column: &str) -> rusqlite::Result<i64> {
    row.get::<_, i64>(column)
}

fn req_text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    row.get::<_, String>(column)
}

fn party_from_row(row: &Row<'_>) -> rusqlite::Result<PartyRecord> {
    Ok(PartyRecord {
        id: req_int(row, contacts::ID)?,
        skypename: req_text(row, contacts::SKYPENAME)?,
        is_permanent: opt_int(row, "is_permanent")?,
        kind: opt_int(row, "type")?,
        aliases: opt_text(row, "aliases")?,
        fullname: opt_text(row, "fullname")?,
        birthday: opt_int(row, "birthday")?,
        gender: opt_int(row, "gender")?,
        languages: opt_text(row, "languages")?,
        country: opt_text(row, "country")?,
        province: opt_text(row, "province")?,
        city: opt_text(row, "city")?,
        phone_home: opt_text(row, "phone_home")?,
        phone_office: opt_text(row, "phone_office")?,
        phone_mobile: opt_text(row, "phone_mobile")?,
        emails: opt_text(row, "emails")?,
        hashed_emails: opt_text(row, "hashed_emails")?,
        homepage: opt_text(row, "homepage")?,
        about: opt_text(row, "about")?,
        avatar_image: opt_blob(row, "avatar_image")?,
        mood_text: opt_text(row, "mood_text")?,
        rich_mood_text: opt_text(row, "rich_mood_text")?,
        timezone: opt_int(row, "timezone")?,
        displayname: opt_text(row, "displayname")?,
        given_displayname: opt_text(row, "given_displayname")?,
    })
}

/// Values in `contacts::COLUMNS` order.
fn party_values(p: &PartyRecord) -> Vec<Value> {
    vec![
        p.is_permanent.into(),
        p.kind.into(),
        p.skypename.clone().into(),
        p.aliases.clone().into(),
        p.fullname.clone().into(),
        p.birthday.into(),
        p.gender.into(),
        p.languages.clone().into(),
        p.country.clone().into(),
        p.province.clone().into(),
        p.city.clone().into(),
        p.phone_home.clone().into(),
        p.phone_office.clone().into(),
        p.phone_mobile.clone().into(),
        p.emails.clone().into(),
        p.hashed_emails.clone().into(),
        p.homepage.clone().into(),
        p.about.clone().into(),
        p.avatar_image.clone().into(),
        p.mood_text.clone().into(),
        p.rich_mood_text.clone().into(),
        p.timezone.into(),
        p.displayname.clone().into(),
        p.given_displayname.clone().into(),
    ]
}

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<ThreadRecord> {
    Ok(ThreadRecord {
        id: ThreadId(req_int(row, conversations::ID)?),
        identity: req_text(row, conversations::IDENTITY)?,
        kind: opt_int(row, "type")?,
        is_permanent: opt_int(row, "is_permanent")?,
        is_bookmarked: opt_int(row, "is_bookmarked")?,
        given_displayname: opt_text(row, "given_displayname")?,
        displayname: opt_text(row, "displayname")?,
        creator: opt_text(row, "creator")?,
        creation_timestamp: opt_int(row, "creation_timestamp")?,
        my_status: opt_int(row, "my_status")?,
        passwordhint: opt_text(row, "passwordhint")?,
        meta_name: opt_text(row, "meta_name")?,
        meta_topic: opt_text(row, "meta_topic")?,
        meta_guidelines: opt_text(row, "meta_guidelines")?,
        meta_picture: opt_blob(row, "meta_picture")?,
        guid: opt_blob(row, "guid")?,
        is_blocked: opt_int(row, "is_blocked")?,
    })
}

/// Values in `conversations::COLUMNS` order.
fn thread_values(t: &ThreadRecord) -> Vec<Value> {
    vec![
        t.is_permanent.into(),
        t.identity.clone().into(),
        t.kind.into(),
        t.is_bookmarked.into(),
        t.given_displayname.clone().into(),
        t.displayname.clone().into(),
        t.creator.clone().into(),
        t.creation_timestamp.into(),
        t.my_status.into(),
        t.passwordhint.clone().into(),
        t.meta_name.clone().into(),
        t.meta_topic.clone().into(),
        t.meta_guidelines.clone().into(),
        t.meta_picture.clone().into(),
        t.guid.clone().into(),
        t.is_blocked.into(),
    ]
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: MessageId(req_int(row, messages::ID)?),
        thread_id: opt_int(row, messages::CONVO_ID)?.map(ThreadId),
        author: opt_text(row, messages::AUTHOR)?,
        body: opt_text(row, "body_xml")?,
        kind: opt_int(row, "type")?,
        remote_id: opt_int(row, "remote_id")?,
        synthesized_from: opt_int(row, "synthesized_from")?,
        timestamp: req_int(row, "timestamp")?,
        is_permanent: opt_int(row, "is_permanent")?,
        chatname: opt_text(row, "chatname")?,
        from_dispname: opt_text(row, "from_dispname")?,
        guid: opt_blob(row, "guid")?,
        dialog_partner: opt_text(row, "dialog_partner")?,
        sending_status: opt_int(row, "sending_status")?,
        consumption_status: opt_int(row, "consumption_status")?,
        edited_by: opt_text(row, "edited_by")?,
        edited_timestamp: opt_int(row, "edited_timestamp")?,
        identities: opt_text(row, "identities")?,
        participant_count: opt_int(row, "participant_count")?,
        chatmsg_type: opt_int(row, "chatmsg_type")?,
        chatmsg_status: opt_int(row, "chatmsg_status")?,
        body_is_rawxml: opt_int(row, "body_is_rawxml")?,
        crc: opt_int(row, "crc")?,
    })
}

/// Values in `messages::COLUMNS` order.
fn message_values(m: &MessageRecord) -> Vec<Value> {
    vec![
        m.is_permanent.into(),
        m.chatname.clone().into(),
        m.author.clone().into(),
        m.from_dispname.clone().into(),
        m.guid.clone().into(),
        m.dialog_partner.clone().into(),
        m.timestamp.into(),
        m.kind.into(),
        m.sending_status.into(),
        m.consumption_status.into(),
        m.edited_by.clone().into(),
        m.edited_timestamp.into(),
        m.body.clone().into(),
        m.identities.clone().into(),
        m.participant_count.into(),
        m.chatmsg_type.into(),
        m.chatmsg_status.into(),
        m.body_is_rawxml.into(),
        m.crc.into(),
        m.remote_id.into(),
        m.thread_id.map(|t| t.0).into(),
    ]
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn select_columns(alias: &str, id: &str, columns: &[&str]) -> String {
    std::iter::once(id)
        .chain(columns.iter().copied())
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SqliteStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        Self::open_with_mode(path, OpenMode::ReadWrite)
    }

    pub fn open_read_only(path: &Path) -> AppResult<Self> {
        Self::open_with_mode(path, OpenMode::ReadOnly)
    }

    fn open_with_mode(path: &Path, mode: OpenMode) -> AppResult<Self> {
        let conn = open_archive(path, mode)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            in_transaction: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_transaction(&self, table: &str) -> AppResult<()> {
        if !self.in_transaction {
            return Err(AppError::store(
                "AM_STORE_NO_TRANSACTION",
                "insert attempted outside of a transaction",
                serde_json::json!({ "table": table }),
            ));
        }
        Ok(())
    }

    fn select<T>(
        &self,
        table: &str,
        sql: &str,
        params: Vec<Value>,
        map: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> AppResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| {
            store_error("AM_STORE_QUERY_FAILED", "failed preparing select", table, e)
        })?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| map(row))
            .map_err(|e| store_error("AM_STORE_QUERY_FAILED", "failed running select", table, e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| {
                store_error("AM_STORE_ROW_INVALID", "failed decoding archive row", table, e)
            })?);
        }
        Ok(out)
    }

    fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> AppResult<i64> {
        self.conn
            .execute(&insert_sql(table, columns), params_from_iter(values))
            .map_err(|e| store_error("AM_STORE_INSERT_FAILED", "failed inserting row", table, e))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn exec(&mut self, sql: &str, code: &str, message: &str) -> AppResult<()> {
        self.conn.execute_batch(sql).map_err(|e| {
            AppError::store(
                code,
                message,
                serde_json::json!({ "error": e.to_string(), "path": self.path }),
            )
        })
    }
}

impl RecordStore for SqliteStore {
    fn parties(&self) -> AppResult<Vec<PartyRecord>> {
        // Contacts without a handle cannot be joined across archives.
        let sql = format!(
            "SELECT {} FROM {} c WHERE c.{} IS NOT NULL ORDER BY c.{}",
            select_columns("c", contacts::ID, contacts::COLUMNS),
            contacts::TABLE,
            contacts::SKYPENAME,
            contacts::ID
        );
        self.select(contacts::TABLE, &sql, Vec::new(), party_from_row)
    }

    fn threads(&self) -> AppResult<Vec<ThreadRecord>> {
        let sql = format!(
            "SELECT {} FROM {} c ORDER BY c.{}",
            select_columns("c", conversations::ID, conversations::COLUMNS),
            conversations::TABLE,
            conversations::ID
        );
        self.select(conversations::TABLE, &sql, Vec::new(), thread_from_row)
    }

    fn messages_where(&self, filter: MessageFilter) -> AppResult<Vec<MessageRecord>> {
        let (provenance, join) = if table_exists(&self.conn, key_provenance::TABLE)? {
            (
                format!("p.{}", key_provenance::SOURCE_LOCAL_ID),
                format!(
                    "LEFT JOIN {} p ON p.{} = m.{}",
                    key_provenance::TABLE,
                    key_provenance::MESSAGE_ID,
                    messages::ID
                ),
            )
        } else {
            ("NULL".to_string(), String::new())
        };

        let (where_clause, params): (String, Vec<Value>) = match filter {
            MessageFilter::All => (String::new(), Vec::new()),
            MessageFilter::WithoutThread => {
                (format!("WHERE m.{} IS NULL", messages::CONVO_ID), Vec::new())
            }
            MessageFilter::WithoutAuthor => (
                format!(
                    "WHERE m.{a} IS NULL OR m.{a} = ''",
                    a = messages::AUTHOR
                ),
                Vec::new(),
            ),
            MessageFilter::InThread(thread_id) => (
                format!("WHERE m.{} = ?1", messages::CONVO_ID),
                vec![Value::Integer(thread_id.0)],
            ),
        };

        let sql = format!(
            "SELECT {}, {} AS synthesized_from FROM {} m {} {} ORDER BY m.{}",
            select_columns("m", messages::ID, messages::COLUMNS),
            provenance,
            messages::TABLE,
            join,
            where_clause,
            messages::ID
        );
        self.select(messages::TABLE, &sql, params, message_from_row)
    }

    fn insert_party(&mut self, row: &PartyRecord) -> AppResult<i64> {
        self.require_transaction(contacts::TABLE)?;
        self.insert(contacts::TABLE, contacts::COLUMNS, party_values(row))
    }

    fn insert_thread(&mut self, row: &ThreadRecord) -> AppResult<ThreadId> {
        self.require_transaction(conversations::TABLE)?;
        self.insert(conversations::TABLE, conversations::COLUMNS, thread_values(row))
            .map(ThreadId)
    }

    fn insert_message(&mut self, row: &MessageRecord) -> AppResult<MessageId> {
        self.require_transaction(messages::TABLE)?;
        let id = self.insert(messages::TABLE, messages::COLUMNS, message_values(row))?;

        if let Some(source_local_id) = row.synthesized_from {
            self.conn
                .execute_batch(key_provenance::CREATE_SQL)
                .map_err(|e| {
                    store_error(
                        "AM_STORE_INSERT_FAILED",
                        "failed ensuring key provenance table",
                        key_provenance::TABLE,
                        e,
                    )
                })?;
            self.conn
                .execute(
                    &insert_sql(
                        key_provenance::TABLE,
                        &[key_provenance::MESSAGE_ID, key_provenance::SOURCE_LOCAL_ID],
                    ),
                    params![id, source_local_id],
                )
                .map_err(|e| {
                    store_error(
                        "AM_STORE_INSERT_FAILED",
                        "failed recording key provenance",
                        key_provenance::TABLE,
                        e,
                    )
                })?;
        }

        Ok(MessageId(id))
    }

    fn begin(&mut self) -> AppResult<()> {
        self.exec(
            "BEGIN IMMEDIATE",
            "AM_STORE_TRANSACTION_FAILED",
            "failed to begin transaction",
        )?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> AppResult<()> {
        self.exec(
            "COMMIT",
            "AM_STORE_TRANSACTION_FAILED",
            "failed to commit transaction",
        )?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> AppResult<()> {
        self.exec(
            "ROLLBACK",
            "AM_STORE_TRANSACTION_FAILED",
            "failed to roll back transaction",
        )?;
        self.in_transaction = false;
        Ok(())
    }
}
