//! Table and column names of the archive format.
//!
//! The `COLUMNS` lists are the allow-listed attribute sets copied on merge.
//! Anything an archive carries beyond them is left at its column default in
//! the target.

/// Archive file name inside a profile directory.
pub const ARCHIVE_FILE_NAME: &str = "main.db";

pub mod contacts {
    pub const TABLE: &str = "contacts";
    pub const ID: &str = "id";
    /// Natural key.
    pub const SKYPENAME: &str = "skypename";
    pub const COLUMNS: &[&str] = &[
        "is_permanent",
        "type",
        "skypename",
        "aliases",
        "fullname",
        "birthday",
        "gender",
        "languages",
        "country",
        "province",
        "city",
        "phone_home",
        "phone_office",
        "phone_mobile",
        "emails",
        "hashed_emails",
        "homepage",
        "about",
        "avatar_image",
        "mood_text",
        "rich_mood_text",
        "timezone",
        "displayname",
        "given_displayname",
    ];
}

pub mod conversations {
    pub const TABLE: &str = "conversations";
    pub const ID: &str = "id";
    /// Natural key.
    pub const IDENTITY: &str = "identity";
    pub const COLUMNS: &[&str] = &[
        "is_permanent",
        "identity",
        "type",
        "is_bookmarked",
        "given_displayname",
        "displayname",
        "creator",
        "creation_timestamp",
        "my_status",
        "passwordhint",
        "meta_name",
        "meta_topic",
        "meta_guidelines",
        "meta_picture",
        "guid",
        "is_blocked",
    ];
}

pub mod messages {
    pub const TABLE: &str = "messages";
    pub const ID: &str = "id";
    pub const CONVO_ID: &str = "convo_id";
    pub const AUTHOR: &str = "author";
    pub const COLUMNS: &[&str] = &[
        "is_permanent",
        "chatname",
        "author",
        "from_dispname",
        "guid",
        "dialog_partner",
        "timestamp",
        "type",
        "sending_status",
        "consumption_status",
        "edited_by",
        "edited_timestamp",
        "body_xml",
        "identities",
        "participant_count",
        "chatmsg_type",
        "chatmsg_status",
        "body_is_rawxml",
        "crc",
        "remote_id",
        "convo_id",
    ];
}

/// Side table owned by the merge tool. Records which target messages had
/// their remote id synthesized from a source-local id.
pub mod key_provenance {
    pub const TABLE: &str = "merge_key_provenance";
    pub const MESSAGE_ID: &str = "message_id";
    pub const SOURCE_LOCAL_ID: &str = "source_local_id";
    pub const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS merge_key_provenance (
           message_id INTEGER PRIMARY KEY,
           source_local_id INTEGER NOT NULL
         )";
}
