use serde::{Deserialize, Serialize};

/// Store-local conversation id. Never compared across stores without going
/// through a [`crate::identity::ThreadIdMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ThreadId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of `contacts`. `skypename` is the natural key.
///
/// `id` is store-local and ignored on insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartyRecord {
    pub id: i64,
    pub skypename: String,
    pub is_permanent: Option<i64>,
    pub kind: Option<i64>,
    pub aliases: Option<String>,
    pub fullname: Option<String>,
    pub birthday: Option<i64>,
    pub gender: Option<i64>,
    pub languages: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub phone_home: Option<String>,
    pub phone_office: Option<String>,
    pub phone_mobile: Option<String>,
    pub emails: Option<String>,
    pub hashed_emails: Option<String>,
    pub homepage: Option<String>,
    pub about: Option<String>,
    pub avatar_image: Option<Vec<u8>>,
    pub mood_text: Option<String>,
    pub rich_mood_text: Option<String>,
    pub timezone: Option<i64>,
    pub displayname: Option<String>,
    pub given_displayname: Option<String>,
}

/// Conversation kind as stored in `conversations.type`.
pub const THREAD_KIND_DIRECT: i64 = 1;
pub const THREAD_KIND_GROUP: i64 = 2;

/// A row of `conversations`. `identity` is the natural key.
///
/// `id` is store-local and ignored on insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadRecord {
    pub id: ThreadId,
    pub identity: String,
    pub kind: Option<i64>,
    pub is_permanent: Option<i64>,
    pub is_bookmarked: Option<i64>,
    pub given_displayname: Option<String>,
    pub displayname: Option<String>,
    pub creator: Option<String>,
    pub creation_timestamp: Option<i64>,
    pub my_status: Option<i64>,
    pub passwordhint: Option<String>,
    pub meta_name: Option<String>,
    pub meta_topic: Option<String>,
    pub meta_guidelines: Option<String>,
    pub meta_picture: Option<Vec<u8>>,
    pub guid: Option<Vec<u8>>,
    pub is_blocked: Option<i64>,
}

/// A row of `messages`.
///
/// Only `thread_id`, `author`, `body`, `kind`, `remote_id`,
/// `synthesized_from` and `timestamp` are inspected by the merge; the rest is
/// copied verbatim. `id` is store-local and ignored on insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageRecord {
    pub id: MessageId,
    pub thread_id: Option<ThreadId>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub kind: Option<i64>,
    pub remote_id: Option<i64>,
    /// Set when `remote_id` was filled in by an earlier merge from the
    /// source-local id of a message that had none.
    pub synthesized_from: Option<i64>,
    pub timestamp: i64,
    pub is_permanent: Option<i64>,
    pub chatname: Option<String>,
    pub from_dispname: Option<String>,
    pub guid: Option<Vec<u8>>,
    pub dialog_partner: Option<String>,
    pub sending_status: Option<i64>,
    pub consumption_status: Option<i64>,
    pub edited_by: Option<String>,
    pub edited_timestamp: Option<i64>,
    pub identities: Option<String>,
    pub participant_count: Option<i64>,
    pub chatmsg_type: Option<i64>,
    pub chatmsg_status: Option<i64>,
    pub body_is_rawxml: Option<i64>,
    pub crc: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrigin {
    Source,
    Target,
}

/// Resolved secondary key of a message.
///
/// A message without a remote correlation id gets a synthesized key from its
/// own local id, tagged with the side it was read from. Synthesized keys never
/// compare equal to a real remote id, nor to a synthesized key of the other
/// side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryKey {
    Remote(i64),
    Synthesized { origin: KeyOrigin, local_id: i64 },
}

impl SecondaryKey {
    pub fn resolve(message: &MessageRecord, side: KeyOrigin) -> Self {
        // Keys synthesized by an earlier merge keep the source namespace so a
        // re-merge of the same source finds them again.
        if let Some(local_id) = message.synthesized_from {
            return SecondaryKey::Synthesized {
                origin: KeyOrigin::Source,
                local_id,
            };
        }
        match message.remote_id {
            Some(remote_id) => SecondaryKey::Remote(remote_id),
            None => SecondaryKey::Synthesized {
                origin: side,
                local_id: message.id.0,
            },
        }
    }
}

impl std::fmt::Display for SecondaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecondaryKey::Remote(id) => write!(f, "remote:{}", id),
            SecondaryKey::Synthesized { origin, local_id } => {
                let side = match origin {
                    KeyOrigin::Source => "source",
                    KeyOrigin::Target => "target",
                };
                write!(f, "synthesized:{}:{}", side, local_id)
            }
        }
    }
}
