//! Immutable snapshot value types.
//!
//! Snapshots are the projections the store hands to consumers. They own
//! all of their data; mutating the store after a snapshot is taken is
//! never observable through it.

use crate::entity::{Message, Metadata, PresenceRecord, ReadCursor, Room, User};
use crate::id::{MessageId, RoomId, UserId};
use serde::Serialize;

/// Immutable projection of a [`Room`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Optional topic line.
    pub topic: Option<String>,
    /// Number of members.
    pub member_count: u32,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            topic: room.topic.clone(),
            member_count: room.member_count,
            metadata: room.metadata.clone(),
        }
    }
}

/// Immutable projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSnapshot {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Optional avatar URL.
    pub avatar_url: Option<String>,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            metadata: user.metadata.clone(),
        }
    }
}

/// Immutable projection of a [`Message`].
///
/// Carries the sender as a prefetched relationship when the store holds
/// the sending user; `None` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSnapshot {
    /// Message identifier.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// User who sent the message.
    pub sender_id: UserId,
    /// Message body.
    pub text: String,
    /// Server-side send time, milliseconds since the epoch.
    pub sent_at_ms: u64,
    /// Free-form metadata.
    pub metadata: Metadata,
    /// Prefetched sender, omitted when the store does not hold the user.
    pub sender: Option<UserSnapshot>,
}

impl MessageSnapshot {
    /// Builds a snapshot of `message` with an optional prefetched sender.
    pub fn with_sender(message: &Message, sender: Option<UserSnapshot>) -> Self {
        Self {
            id: message.id.clone(),
            room_id: message.room_id.clone(),
            sender_id: message.sender_id.clone(),
            text: message.text.clone(),
            sent_at_ms: message.sent_at_ms,
            metadata: message.metadata.clone(),
            sender,
        }
    }
}

/// Immutable projection of a [`ReadCursor`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadCursorSnapshot {
    /// Room the cursor tracks.
    pub room_id: RoomId,
    /// User the cursor belongs to.
    pub user_id: UserId,
    /// Last message the user has read, if any.
    pub last_read: Option<MessageId>,
    /// Monotonic read position.
    pub position: u64,
}

impl From<&ReadCursor> for ReadCursorSnapshot {
    fn from(cursor: &ReadCursor) -> Self {
        Self {
            room_id: cursor.room_id.clone(),
            user_id: cursor.user_id.clone(),
            last_read: cursor.last_read.clone(),
            position: cursor.position,
        }
    }
}

/// Immutable projection of a [`PresenceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceSnapshot {
    /// User this record describes.
    pub user_id: UserId,
    /// Whether the user is online.
    pub is_online: bool,
    /// Last time the user was seen, milliseconds since the epoch.
    pub last_seen_ms: u64,
}

impl From<&PresenceRecord> for PresenceSnapshot {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            is_online: record.is_online,
            last_seen_ms: record.last_seen_ms,
        }
    }
}
