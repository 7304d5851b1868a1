//! The immutable, shareable view of everything currently known.

use chatsync_model::{
    MessageId, MessageSnapshot, PresenceSnapshot, ReadCursorSnapshot, RoomId, RoomSnapshot, UserId,
    UserSnapshot,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Connection status reported by the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Real-time connection is established.
    Connected,
    /// A connection attempt is in progress.
    Connecting,
    /// No connection.
    Disconnected,
}

impl ConnectionStatus {
    /// Returns true if the connection is established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StateInner {
    pub(crate) rooms: BTreeMap<RoomId, RoomSnapshot>,
    pub(crate) users: BTreeMap<UserId, UserSnapshot>,
    pub(crate) messages: BTreeMap<MessageId, MessageSnapshot>,
    pub(crate) cursors: BTreeMap<(RoomId, UserId), ReadCursorSnapshot>,
    pub(crate) presence: BTreeMap<UserId, PresenceSnapshot>,
    pub(crate) connection: ConnectionStatus,
    pub(crate) revision: u64,
}

/// An immutable value holding snapshots of all entities plus the current
/// connection status.
///
/// Produced only by the store; every accepted mutation produces a new
/// `State` with a strictly higher revision. Cloning is cheap (the inner
/// data is shared) and a clone never observes later mutations.
#[derive(Debug, Clone)]
pub struct State {
    inner: Arc<StateInner>,
}

impl State {
    /// The empty state a freshly constructed store publishes.
    #[must_use]
    pub fn initial() -> Self {
        Self::from_inner(StateInner {
            rooms: BTreeMap::new(),
            users: BTreeMap::new(),
            messages: BTreeMap::new(),
            cursors: BTreeMap::new(),
            presence: BTreeMap::new(),
            connection: ConnectionStatus::Disconnected,
            revision: 0,
        })
    }

    pub(crate) fn from_inner(inner: StateInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Revision counter; strictly increasing across accepted mutations.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision
    }

    /// The connection status at the time this state was produced.
    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.inner.connection
    }

    /// Looks up a room.
    #[must_use]
    pub fn room(&self, id: &RoomId) -> Option<&RoomSnapshot> {
        self.inner.rooms.get(id)
    }

    /// All rooms, ordered by ID.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomSnapshot> {
        self.inner.rooms.values()
    }

    /// Number of rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    /// Looks up a user.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&UserSnapshot> {
        self.inner.users.get(id)
    }

    /// All users, ordered by ID.
    pub fn users(&self) -> impl Iterator<Item = &UserSnapshot> {
        self.inner.users.values()
    }

    /// Looks up a message.
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&MessageSnapshot> {
        self.inner.messages.get(id)
    }

    /// Number of messages across all rooms.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.messages.len()
    }

    /// Messages in a room, ordered by send time, then ID.
    #[must_use]
    pub fn messages_in(&self, room_id: &RoomId) -> Vec<&MessageSnapshot> {
        let mut messages: Vec<&MessageSnapshot> = self
            .inner
            .messages
            .values()
            .filter(|m| &m.room_id == room_id)
            .collect();
        messages.sort_by(|a, b| (a.sent_at_ms, &a.id).cmp(&(b.sent_at_ms, &b.id)));
        messages
    }

    /// Looks up a user's read cursor in a room.
    #[must_use]
    pub fn read_cursor(&self, room_id: &RoomId, user_id: &UserId) -> Option<&ReadCursorSnapshot> {
        self.inner
            .cursors
            .get(&(room_id.clone(), user_id.clone()))
    }

    /// Looks up a user's presence.
    #[must_use]
    pub fn presence(&self, user_id: &UserId) -> Option<&PresenceSnapshot> {
        self.inner.presence.get(user_id)
    }

    /// Returns true if no entities are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.rooms.is_empty()
            && self.inner.users.is_empty()
            && self.inner.messages.is_empty()
            && self.inner.cursors.is_empty()
            && self.inner.presence.is_empty()
    }
}
