//! Conversion from store-owned entities to immutable snapshots.

use chatsync_model::{
    Message, MessageSnapshot, PresenceRecord, PresenceSnapshot, ReadCursor, ReadCursorSnapshot,
    Room, RoomSnapshot, User, UserId, UserSnapshot,
};
use std::collections::BTreeMap;

/// The bounded set of related entities a snapshot conversion may consult.
///
/// Relationships are prefetched through this view so a snapshot never
/// holds a reference to state it does not own. Only users are reachable:
/// the one declared relationship is a message's sender.
#[derive(Debug, Clone, Copy)]
pub struct EntityGraph<'a> {
    users: &'a BTreeMap<UserId, User>,
}

impl<'a> EntityGraph<'a> {
    /// Creates a graph over the store's user table.
    #[must_use]
    pub fn new(users: &'a BTreeMap<UserId, User>) -> Self {
        Self { users }
    }

    /// An empty graph, for conversions that need no relationships.
    #[must_use]
    pub fn empty() -> EntityGraph<'static> {
        static NO_USERS: BTreeMap<UserId, User> = BTreeMap::new();
        EntityGraph { users: &NO_USERS }
    }

    /// Looks up a user by ID.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&'a User> {
        self.users.get(id)
    }
}

/// Contract for converting a mutable, store-owned entity into an
/// immutable snapshot safe to hand outside the store.
///
/// Conversions are pure over the entity's current field values. If a
/// related entity is absent from the graph, the relationship is omitted
/// from the snapshot; a snapshot never carries a dangling reference.
pub trait Snapshotable {
    /// The snapshot type this entity converts to.
    type Output;

    /// Produces an immutable snapshot of the entity.
    fn to_snapshot(&self, graph: &EntityGraph<'_>) -> Self::Output;
}

impl Snapshotable for Room {
    type Output = RoomSnapshot;

    fn to_snapshot(&self, _graph: &EntityGraph<'_>) -> RoomSnapshot {
        RoomSnapshot::from(self)
    }
}

impl Snapshotable for User {
    type Output = UserSnapshot;

    fn to_snapshot(&self, _graph: &EntityGraph<'_>) -> UserSnapshot {
        UserSnapshot::from(self)
    }
}

impl Snapshotable for Message {
    type Output = MessageSnapshot;

    fn to_snapshot(&self, graph: &EntityGraph<'_>) -> MessageSnapshot {
        let sender = graph.user(&self.sender_id).map(UserSnapshot::from);
        MessageSnapshot::with_sender(self, sender)
    }
}

impl Snapshotable for ReadCursor {
    type Output = ReadCursorSnapshot;

    fn to_snapshot(&self, _graph: &EntityGraph<'_>) -> ReadCursorSnapshot {
        ReadCursorSnapshot::from(self)
    }
}

impl Snapshotable for PresenceRecord {
    type Output = PresenceSnapshot;

    fn to_snapshot(&self, _graph: &EntityGraph<'_>) -> PresenceSnapshot {
        PresenceSnapshot::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_prefetches_known_sender() {
        let mut users = BTreeMap::new();
        users.insert(UserId::new("u1"), User::new("u1", "Ada"));
        let graph = EntityGraph::new(&users);

        let message = Message::new("m1", "r1", "u1", "hi", 1);
        let snap = message.to_snapshot(&graph);
        assert_eq!(snap.sender.as_ref().unwrap().display_name, "Ada");
    }

    #[test]
    fn missing_sender_is_omitted() {
        let message = Message::new("m1", "r1", "ghost", "hi", 1);
        let snap = message.to_snapshot(&EntityGraph::empty());
        assert!(snap.sender.is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_entity() {
        let mut room = Room::new("r1", "general");
        let snap = room.to_snapshot(&EntityGraph::empty());

        room.name = "changed".into();
        room.member_count = 99;
        assert_eq!(snap.name, "general");
        assert_eq!(snap.member_count, 0);
    }
}
