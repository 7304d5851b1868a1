//! Versioned mutations delivered to the store.
//!
//! Payloads form a closed union, validated before they reach the store's
//! merge step. The transport collaborator hands over decoded events as
//! `Mutation` values; anything that fails `validate` is rejected by the
//! store as malformed without touching state or version counters.

use crate::entity::{Message, PresenceRecord, ReadCursor, Room, User};
use crate::id::{MessageId, RoomId, UserId};
use crate::version::{Version, VersionSignature, Versionable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a mutation failed structural validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidMutation {
    /// A required identifier is empty.
    #[error("empty identifier: {field}")]
    EmptyId {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The signature's embedded room disagrees with the payload's room.
    #[error("signature targets {signature_room} but payload targets {payload_room}")]
    RoomMismatch {
        /// Room embedded in the signature.
        signature_room: RoomId,
        /// Room referenced by the payload.
        payload_room: RoomId,
    },

    /// A removal signature arrived with a non-removal payload.
    #[error("removal signature {signature} carries a non-removal payload")]
    RemovalPayloadExpected {
        /// The removal-kind signature.
        signature: VersionSignature,
    },
}

/// A single decoded change payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationPayload {
    /// A room was created or its attributes changed.
    RoomUpserted(Room),
    /// A room was removed.
    RoomRemoved {
        /// The room to remove.
        room_id: RoomId,
    },
    /// A user was created or its attributes changed.
    UserUpserted(User),
    /// A message was posted or edited.
    MessagePosted(Message),
    /// A message was removed.
    MessageRemoved {
        /// The message to remove.
        message_id: MessageId,
    },
    /// A read cursor moved.
    ReadCursorMoved(ReadCursor),
    /// A user's presence changed.
    PresenceChanged(PresenceRecord),
    /// A user joined or left a room.
    MembershipChanged {
        /// The room whose membership changed.
        room_id: RoomId,
        /// The user who joined or left.
        user_id: UserId,
        /// True on join, false on leave.
        joined: bool,
    },
}

impl MutationPayload {
    /// Returns the room this payload targets, if any.
    #[must_use]
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            MutationPayload::RoomUpserted(room) => Some(&room.id),
            MutationPayload::RoomRemoved { room_id } => Some(room_id),
            MutationPayload::MessagePosted(message) => Some(&message.room_id),
            MutationPayload::ReadCursorMoved(cursor) => Some(&cursor.room_id),
            MutationPayload::MembershipChanged { room_id, .. } => Some(room_id),
            MutationPayload::UserUpserted(_)
            | MutationPayload::MessageRemoved { .. }
            | MutationPayload::PresenceChanged(_) => None,
        }
    }

    /// Returns true if accepting this payload deletes an entity.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            MutationPayload::RoomRemoved { .. }
                | MutationPayload::MessageRemoved { .. }
                | MutationPayload::MembershipChanged { joined: false, .. }
        )
    }
}

/// A versioned, signed change envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Ordering domain.
    pub signature: VersionSignature,
    /// Version within the signature domain.
    pub version: Version,
    /// The decoded change.
    pub payload: MutationPayload,
}

impl Mutation {
    /// Creates a mutation with an explicit signature.
    pub fn new(signature: VersionSignature, version: Version, payload: MutationPayload) -> Self {
        Self {
            signature,
            version,
            payload,
        }
    }

    /// A room upsert signed as `RoomUpdated(room.id)`.
    pub fn room_upserted(room: Room, version: Version) -> Self {
        let signature = VersionSignature::RoomUpdated(room.id.clone());
        Self::new(signature, version, MutationPayload::RoomUpserted(room))
    }

    /// A room removal signed as `RoomDeleted(room_id)`.
    pub fn room_removed(room_id: RoomId, version: Version) -> Self {
        let signature = VersionSignature::RoomDeleted(room_id.clone());
        Self::new(signature, version, MutationPayload::RoomRemoved { room_id })
    }

    /// A user upsert signed as `Unsigned` (users are not room-scoped).
    pub fn user_upserted(user: User, version: Version) -> Self {
        Self::new(
            VersionSignature::Unsigned,
            version,
            MutationPayload::UserUpserted(user),
        )
    }

    /// A message post signed as `RoomUpdated(message.room_id)`.
    pub fn message_posted(message: Message, version: Version) -> Self {
        let signature = VersionSignature::RoomUpdated(message.room_id.clone());
        Self::new(signature, version, MutationPayload::MessagePosted(message))
    }

    /// A message removal signed as `RoomUpdated(room_id)`.
    pub fn message_removed(room_id: RoomId, message_id: MessageId, version: Version) -> Self {
        Self::new(
            VersionSignature::RoomUpdated(room_id),
            version,
            MutationPayload::MessageRemoved { message_id },
        )
    }

    /// A cursor move signed as `ReadStateUpdated(cursor.room_id)`.
    pub fn read_cursor_moved(cursor: ReadCursor, version: Version) -> Self {
        let signature = VersionSignature::ReadStateUpdated(cursor.room_id.clone());
        Self::new(signature, version, MutationPayload::ReadCursorMoved(cursor))
    }

    /// A presence change signed as `SubscriptionStateUpdated`.
    pub fn presence_changed(record: PresenceRecord, version: Version) -> Self {
        Self::new(
            VersionSignature::SubscriptionStateUpdated,
            version,
            MutationPayload::PresenceChanged(record),
        )
    }

    /// A membership change signed as `AddedToRoom` or `RemovedFromRoom`.
    pub fn membership_changed(
        room_id: RoomId,
        user_id: UserId,
        joined: bool,
        version: Version,
    ) -> Self {
        let signature = if joined {
            VersionSignature::AddedToRoom(room_id.clone())
        } else {
            VersionSignature::RemovedFromRoom(room_id.clone())
        };
        Self::new(
            signature,
            version,
            MutationPayload::MembershipChanged {
                room_id,
                user_id,
                joined,
            },
        )
    }

    /// Replaces the signature, keeping version and payload.
    ///
    /// Used by bulk backfills that deliver page results under
    /// `InitialState` regardless of payload kind.
    #[must_use]
    pub fn with_signature(mut self, signature: VersionSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Checks the structural invariants the store relies on.
    ///
    /// Foreign references (a message naming a room the store does not
    /// hold) are the store's concern; this validates only what the
    /// envelope itself can see.
    pub fn validate(&self) -> Result<(), InvalidMutation> {
        self.validate_ids()?;

        if let (Some(signature_room), Some(payload_room)) =
            (self.signature.room(), self.payload.room())
        {
            if signature_room != payload_room {
                return Err(InvalidMutation::RoomMismatch {
                    signature_room: signature_room.clone(),
                    payload_room: payload_room.clone(),
                });
            }
        }

        if self.signature.is_removal() && !self.payload.is_removal() {
            return Err(InvalidMutation::RemovalPayloadExpected {
                signature: self.signature.clone(),
            });
        }

        Ok(())
    }

    fn validate_ids(&self) -> Result<(), InvalidMutation> {
        let empty = |field| Err(InvalidMutation::EmptyId { field });
        match &self.payload {
            MutationPayload::RoomUpserted(room) if room.id.is_empty() => empty("room.id"),
            MutationPayload::RoomRemoved { room_id } if room_id.is_empty() => empty("room_id"),
            MutationPayload::UserUpserted(user) if user.id.is_empty() => empty("user.id"),
            MutationPayload::MessagePosted(message) => {
                if message.id.is_empty() {
                    empty("message.id")
                } else if message.room_id.is_empty() {
                    empty("message.room_id")
                } else if message.sender_id.is_empty() {
                    empty("message.sender_id")
                } else {
                    Ok(())
                }
            }
            MutationPayload::MessageRemoved { message_id } if message_id.is_empty() => {
                empty("message_id")
            }
            MutationPayload::ReadCursorMoved(cursor) => {
                if cursor.room_id.is_empty() {
                    empty("cursor.room_id")
                } else if cursor.user_id.is_empty() {
                    empty("cursor.user_id")
                } else {
                    Ok(())
                }
            }
            MutationPayload::PresenceChanged(record) if record.user_id.is_empty() => {
                empty("presence.user_id")
            }
            MutationPayload::MembershipChanged { room_id, user_id, .. } => {
                if room_id.is_empty() {
                    empty("membership.room_id")
                } else if user_id.is_empty() {
                    empty("membership.user_id")
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

impl Versionable for Mutation {
    fn version(&self) -> Version {
        self.version
    }

    fn signature(&self) -> &VersionSignature {
        &self.signature
    }
}
