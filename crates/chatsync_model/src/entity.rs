//! Chat entities owned by the store.
//!
//! Entities are the mutable records the store holds. They are created on
//! the first accepted mutation or page result that mentions them, mutated
//! only inside the store's apply step, and removed when a deletion-kind
//! mutation is accepted.

use crate::id::{MessageId, RoomId, UserId};
use serde::{Deserialize, Serialize};

/// Free-form entity metadata.
///
/// Always JSON-representable; a round-trip through the persistence
/// backing must never fail for values of this type.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A chat room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Stable room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Optional topic line.
    pub topic: Option<String>,
    /// Number of members currently in the room.
    pub member_count: u32,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl Room {
    /// Creates a room with the given ID and name.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            topic: None,
            member_count: 0,
            metadata: Metadata::new(),
        }
    }

    /// Sets the topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sets the member count.
    #[must_use]
    pub fn with_member_count(mut self, count: u32) -> Self {
        self.member_count = count;
        self
    }
}

/// A chat user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Optional avatar URL.
    pub avatar_url: Option<String>,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl User {
    /// Creates a user with the given ID and display name.
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            metadata: Metadata::new(),
        }
    }
}

/// A message within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable message identifier.
    pub id: MessageId,
    /// The room this message belongs to.
    pub room_id: RoomId,
    /// The user who sent it.
    pub sender_id: UserId,
    /// Message body.
    pub text: String,
    /// Server-side send time, milliseconds since the epoch.
    pub sent_at_ms: u64,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl Message {
    /// Creates a message.
    pub fn new(
        id: impl Into<MessageId>,
        room_id: impl Into<RoomId>,
        sender_id: impl Into<UserId>,
        text: impl Into<String>,
        sent_at_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            sent_at_ms,
            metadata: Metadata::new(),
        }
    }
}

/// A user's read position within a room.
///
/// Keyed by `(room_id, user_id)` in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadCursor {
    /// The room the cursor tracks.
    pub room_id: RoomId,
    /// The user the cursor belongs to.
    pub user_id: UserId,
    /// Last message the user has read, if any.
    pub last_read: Option<MessageId>,
    /// Monotonic read position within the room.
    pub position: u64,
}

impl ReadCursor {
    /// Creates a read cursor at the given position.
    pub fn new(room_id: impl Into<RoomId>, user_id: impl Into<UserId>, position: u64) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            last_read: None,
            position,
        }
    }

    /// Sets the last-read message.
    #[must_use]
    pub fn with_last_read(mut self, message_id: impl Into<MessageId>) -> Self {
        self.last_read = Some(message_id.into());
        self
    }
}

/// A user's presence, keyed by user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// The user this record describes.
    pub user_id: UserId,
    /// Whether the user is currently online.
    pub is_online: bool,
    /// Last time the user was seen, milliseconds since the epoch.
    pub last_seen_ms: u64,
}

impl PresenceRecord {
    /// Creates a presence record.
    pub fn new(user_id: impl Into<UserId>, is_online: bool, last_seen_ms: u64) -> Self {
        Self {
            user_id: user_id.into(),
            is_online,
            last_seen_ms,
        }
    }
}
