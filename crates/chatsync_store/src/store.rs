//! The canonical store: single point of mutation for all chat state.

use crate::backing::StateBacking;
use crate::broadcast::{StateFeed, Subscription, SubscriptionId};
use crate::error::StoreResult;
use crate::snapshot::{EntityGraph, Snapshotable};
use crate::state::{ConnectionStatus, State, StateInner};
use chatsync_model::{
    Message, MessageId, MessageSnapshot, Mutation, MutationPayload, PresenceRecord, ReadCursor,
    Room, RoomId, RoomSnapshot, User, UserId, UserSnapshot, Version, VersionSignature, Versionable,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of applying one mutation.
///
/// Stale and malformed rejections are ordinary outcomes, not errors:
/// redelivery and out-of-order arrival are expected, and a rejection
/// leaves the store exactly as it was.
#[derive(Debug, Clone)]
pub enum ApplyResult {
    /// The mutation was merged; carries the resulting state.
    Applied(State),
    /// The mutation's version was not newer than the last accepted one
    /// in its signature domain. No state was touched.
    RejectedStale,
    /// The payload failed validation. No state was touched and the
    /// signature's version counter did not advance.
    RejectedMalformed(String),
}

impl ApplyResult {
    /// Returns true if the mutation was merged.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyResult::Applied(_))
    }

    /// The resulting state, if the mutation was merged.
    #[must_use]
    pub fn state(&self) -> Option<&State> {
        match self {
            ApplyResult::Applied(state) => Some(state),
            _ => None,
        }
    }
}

/// Counters describing store activity.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Mutations merged.
    pub applied: u64,
    /// Mutations rejected as stale.
    pub stale_rejections: u64,
    /// Mutations rejected as malformed.
    pub malformed_rejections: u64,
    /// Backing writes that failed (logged, state unaffected).
    pub backing_failures: u64,
}

/// The mutable entity tables, owned exclusively by the store.
#[derive(Debug, Default)]
struct Entities {
    rooms: BTreeMap<RoomId, Room>,
    users: BTreeMap<UserId, User>,
    messages: BTreeMap<MessageId, Message>,
    cursors: BTreeMap<(RoomId, UserId), ReadCursor>,
    presence: BTreeMap<UserId, PresenceRecord>,
}

/// Entity forms written to the persistence backing, tagged by kind.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PersistedEntity {
    Room(Room),
    User(User),
    Message(Message),
    Cursor(ReadCursor),
    Presence(PresenceRecord),
}

/// A backing operation produced by a merge.
#[derive(Debug)]
enum WriteBack {
    Put { key: String, entity: PersistedEntity },
    Delete { key: String },
}

fn room_key(id: &RoomId) -> String {
    format!("room/{}", id.as_str())
}

fn user_key(id: &UserId) -> String {
    format!("user/{}", id.as_str())
}

fn message_key(id: &MessageId) -> String {
    format!("message/{}", id.as_str())
}

fn cursor_key(room_id: &RoomId, user_id: &UserId) -> String {
    format!("cursor/{}/{}", room_id.as_str(), user_id.as_str())
}

fn presence_key(id: &UserId) -> String {
    format!("presence/{}", id.as_str())
}

/// Everything guarded by the store's commit section.
struct Synced {
    entities: Entities,
    versions: HashMap<VersionSignature, Version>,
    feed: StateFeed,
    connection: ConnectionStatus,
    revision: u64,
}

/// The canonical container of current chat state.
///
/// All mutation flows through [`Store::apply`] under one commit mutex,
/// so merges never interleave and the reject-if-stale check is atomic
/// with the merge it guards. Reads of the latest state go through a
/// published copy-on-write reference and never wait on an in-flight
/// apply.
pub struct Store {
    sync: Mutex<Synced>,
    published: RwLock<State>,
    stats: RwLock<StoreStats>,
    backing: Option<Arc<dyn StateBacking>>,
}

impl Store {
    /// Creates an empty store with no persistence backing.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates an empty store that forwards accepted writes to `backing`.
    #[must_use]
    pub fn with_backing(backing: Arc<dyn StateBacking>) -> Self {
        Self::build(Some(backing))
    }

    fn build(backing: Option<Arc<dyn StateBacking>>) -> Self {
        Self {
            sync: Mutex::new(Synced {
                entities: Entities::default(),
                versions: HashMap::new(),
                feed: StateFeed::new(),
                connection: ConnectionStatus::Disconnected,
                revision: 0,
            }),
            published: RwLock::new(State::initial()),
            stats: RwLock::new(StoreStats::default()),
            backing,
        }
    }

    /// Applies one versioned mutation.
    ///
    /// Replays and out-of-order redelivery come back as
    /// [`ApplyResult::RejectedStale`] without touching state, so the
    /// operation is idempotent per `(signature, version)`.
    pub fn apply(&self, mutation: Mutation) -> ApplyResult {
        let mut sync = self.sync.lock();

        if let Some(last) = sync.versions.get(mutation.signature()) {
            if mutation.version() <= *last {
                debug!(
                    signature = %mutation.signature(),
                    version = %mutation.version(),
                    last = %last,
                    "stale mutation rejected"
                );
                drop(sync);
                self.stats.write().stale_rejections += 1;
                return ApplyResult::RejectedStale;
            }
        }

        if let Err(invalid) = mutation.validate() {
            let reason = invalid.to_string();
            warn!(signature = %mutation.signature(), %reason, "malformed mutation rejected");
            drop(sync);
            self.stats.write().malformed_rejections += 1;
            return ApplyResult::RejectedMalformed(reason);
        }

        let write_backs = match Self::merge(&mut sync.entities, &mutation.payload) {
            Ok(write_backs) => write_backs,
            Err(reason) => {
                warn!(signature = %mutation.signature(), %reason, "malformed mutation rejected");
                drop(sync);
                self.stats.write().malformed_rejections += 1;
                return ApplyResult::RejectedMalformed(reason);
            }
        };

        sync.versions
            .insert(mutation.signature().clone(), mutation.version());
        sync.revision += 1;

        let state = Self::build_state(&sync.entities, sync.connection, sync.revision);
        *self.published.write() = state.clone();
        sync.feed.publish(&state);

        if let Some(backing) = &self.backing {
            if let Err(error) = Self::write_back(backing.as_ref(), write_backs) {
                warn!(%error, "backing write failed");
                self.stats.write().backing_failures += 1;
            }
        }

        drop(sync);
        self.stats.write().applied += 1;
        ApplyResult::Applied(state)
    }

    /// Registers a listener.
    ///
    /// Joins the notification set and captures the current state in one
    /// step under the commit section, so the listener neither misses a
    /// state produced right after registration nor receives the initial
    /// state twice.
    pub fn register(&self) -> Subscription {
        let mut sync = self.sync.lock();
        let current = self.published.read().clone();
        sync.feed.subscribe(current)
    }

    /// Removes a listener. Unknown or already-removed IDs are a no-op.
    pub fn unregister(&self, id: SubscriptionId) {
        self.sync.lock().feed.unsubscribe(id);
    }

    /// The latest published state.
    ///
    /// Reads the copy-on-write reference; never waits on an in-flight
    /// apply and never observes a half-applied mutation.
    #[must_use]
    pub fn current_state(&self) -> State {
        self.published.read().clone()
    }

    /// Folds the transport collaborator's connection signal into the
    /// published state.
    pub fn set_connection_status(&self, status: ConnectionStatus) {
        let mut sync = self.sync.lock();
        if sync.connection == status {
            return;
        }
        debug!(?status, "connection status changed");
        sync.connection = status;
        sync.revision += 1;
        let state = Self::build_state(&sync.entities, sync.connection, sync.revision);
        *self.published.write() = state.clone();
        sync.feed.publish(&state);
    }

    /// Point read of one room, outside the push path.
    #[must_use]
    pub fn snapshot_room(&self, id: &RoomId) -> Option<RoomSnapshot> {
        let sync = self.sync.lock();
        let graph = EntityGraph::new(&sync.entities.users);
        sync.entities.rooms.get(id).map(|r| r.to_snapshot(&graph))
    }

    /// Point read of one user, outside the push path.
    #[must_use]
    pub fn snapshot_user(&self, id: &UserId) -> Option<UserSnapshot> {
        let sync = self.sync.lock();
        let graph = EntityGraph::new(&sync.entities.users);
        sync.entities.users.get(id).map(|u| u.to_snapshot(&graph))
    }

    /// Point read of one message, with its sender prefetched when the
    /// store holds the sending user.
    #[must_use]
    pub fn snapshot_message(&self, id: &MessageId) -> Option<MessageSnapshot> {
        let sync = self.sync.lock();
        let graph = EntityGraph::new(&sync.entities.users);
        sync.entities
            .messages
            .get(id)
            .map(|m| m.to_snapshot(&graph))
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sync.lock().feed.subscriber_count()
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }

    /// Merges a validated payload into the entity tables.
    ///
    /// Returns the backing operations the merge implies, or the reason
    /// the payload is malformed (unknown foreign reference). Removals of
    /// entities the store never held are accepted as no-ops so that
    /// redelivered deletions stay idempotent.
    fn merge(entities: &mut Entities, payload: &MutationPayload) -> Result<Vec<WriteBack>, String> {
        match payload {
            MutationPayload::RoomUpserted(room) => {
                entities.rooms.insert(room.id.clone(), room.clone());
                Ok(vec![WriteBack::Put {
                    key: room_key(&room.id),
                    entity: PersistedEntity::Room(room.clone()),
                }])
            }
            MutationPayload::RoomRemoved { room_id } => {
                let mut write_backs = Vec::new();
                if entities.rooms.remove(room_id).is_some() {
                    write_backs.push(WriteBack::Delete {
                        key: room_key(room_id),
                    });
                }

                let removed_messages: Vec<MessageId> = entities
                    .messages
                    .values()
                    .filter(|m| &m.room_id == room_id)
                    .map(|m| m.id.clone())
                    .collect();
                for id in removed_messages {
                    entities.messages.remove(&id);
                    write_backs.push(WriteBack::Delete {
                        key: message_key(&id),
                    });
                }

                let removed_cursors: Vec<(RoomId, UserId)> = entities
                    .cursors
                    .keys()
                    .filter(|(r, _)| r == room_id)
                    .cloned()
                    .collect();
                for key in removed_cursors {
                    entities.cursors.remove(&key);
                    write_backs.push(WriteBack::Delete {
                        key: cursor_key(&key.0, &key.1),
                    });
                }

                Ok(write_backs)
            }
            MutationPayload::UserUpserted(user) => {
                entities.users.insert(user.id.clone(), user.clone());
                Ok(vec![WriteBack::Put {
                    key: user_key(&user.id),
                    entity: PersistedEntity::User(user.clone()),
                }])
            }
            MutationPayload::MessagePosted(message) => {
                if !entities.rooms.contains_key(&message.room_id) {
                    return Err(format!(
                        "message {} references unknown room {}",
                        message.id, message.room_id
                    ));
                }
                entities
                    .messages
                    .insert(message.id.clone(), message.clone());
                Ok(vec![WriteBack::Put {
                    key: message_key(&message.id),
                    entity: PersistedEntity::Message(message.clone()),
                }])
            }
            MutationPayload::MessageRemoved { message_id } => {
                if entities.messages.remove(message_id).is_some() {
                    Ok(vec![WriteBack::Delete {
                        key: message_key(message_id),
                    }])
                } else {
                    Ok(Vec::new())
                }
            }
            MutationPayload::ReadCursorMoved(cursor) => {
                if !entities.rooms.contains_key(&cursor.room_id) {
                    return Err(format!(
                        "read cursor references unknown room {}",
                        cursor.room_id
                    ));
                }
                entities.cursors.insert(
                    (cursor.room_id.clone(), cursor.user_id.clone()),
                    cursor.clone(),
                );
                Ok(vec![WriteBack::Put {
                    key: cursor_key(&cursor.room_id, &cursor.user_id),
                    entity: PersistedEntity::Cursor(cursor.clone()),
                }])
            }
            MutationPayload::PresenceChanged(record) => {
                entities
                    .presence
                    .insert(record.user_id.clone(), record.clone());
                Ok(vec![WriteBack::Put {
                    key: presence_key(&record.user_id),
                    entity: PersistedEntity::Presence(record.clone()),
                }])
            }
            MutationPayload::MembershipChanged {
                room_id, joined, ..
            } => {
                let Some(room) = entities.rooms.get_mut(room_id) else {
                    return Err(format!("membership change references unknown room {room_id}"));
                };
                if *joined {
                    room.member_count += 1;
                } else {
                    room.member_count = room.member_count.saturating_sub(1);
                }
                Ok(vec![WriteBack::Put {
                    key: room_key(room_id),
                    entity: PersistedEntity::Room(room.clone()),
                }])
            }
        }
    }

    /// Builds the immutable state from the entity tables.
    fn build_state(entities: &Entities, connection: ConnectionStatus, revision: u64) -> State {
        let graph = EntityGraph::new(&entities.users);
        State::from_inner(StateInner {
            rooms: entities
                .rooms
                .iter()
                .map(|(id, room)| (id.clone(), room.to_snapshot(&graph)))
                .collect(),
            users: entities
                .users
                .iter()
                .map(|(id, user)| (id.clone(), user.to_snapshot(&graph)))
                .collect(),
            messages: entities
                .messages
                .iter()
                .map(|(id, message)| (id.clone(), message.to_snapshot(&graph)))
                .collect(),
            cursors: entities
                .cursors
                .iter()
                .map(|(key, cursor)| (key.clone(), cursor.to_snapshot(&graph)))
                .collect(),
            presence: entities
                .presence
                .iter()
                .map(|(id, record)| (id.clone(), record.to_snapshot(&graph)))
                .collect(),
            connection,
            revision,
        })
    }

    /// Forwards merge write-backs to the persistence backing.
    ///
    /// Each entity is serialized in full before its write is issued, so
    /// a serialization failure produces no write at all.
    fn write_back(backing: &dyn StateBacking, operations: Vec<WriteBack>) -> StoreResult<()> {
        for operation in operations {
            match operation {
                WriteBack::Put { key, entity } => {
                    let bytes = serde_json::to_vec(&entity)?;
                    backing.put(&key, bytes)?;
                }
                WriteBack::Delete { key } => backing.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.current_state();
        f.debug_struct("Store")
            .field("revision", &state.revision())
            .field("rooms", &state.room_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::InMemoryBacking;
    use crate::error::StoreError;

    fn room_named(id: &str, name: &str) -> Room {
        Room::new(id, name)
    }

    fn seed_room(store: &Store, id: &str) {
        let result = store.apply(
            Mutation::room_upserted(room_named(id, "seeded"), Version::new(1))
                .with_signature(VersionSignature::InitialState),
        );
        assert!(result.is_applied());
    }

    #[test]
    fn rename_then_stale_rename() {
        let store = Store::new();

        let result = store.apply(Mutation::room_upserted(
            room_named("r1", "A"),
            Version::new(1),
        ));
        assert!(result.is_applied());

        let result = store.apply(Mutation::room_upserted(
            room_named("r1", "B"),
            Version::new(1),
        ));
        assert!(matches!(result, ApplyResult::RejectedStale));

        let snap = store.snapshot_room(&RoomId::new("r1")).unwrap();
        assert_eq!(snap.name, "A");
    }

    #[test]
    fn replay_is_idempotent() {
        let store = Store::new();
        let mutation = Mutation::room_upserted(room_named("r1", "A"), Version::new(3));

        let first = store.apply(mutation.clone());
        let after_first = first.state().unwrap().clone();

        let second = store.apply(mutation);
        assert!(matches!(second, ApplyResult::RejectedStale));

        let current = store.current_state();
        assert_eq!(current.revision(), after_first.revision());
        assert_eq!(
            current.room(&RoomId::new("r1")),
            after_first.room(&RoomId::new("r1"))
        );
    }

    #[test]
    fn only_newer_versions_win() {
        let store = Store::new();

        assert!(store
            .apply(Mutation::room_upserted(room_named("r1", "v2"), Version::new(2)))
            .is_applied());
        assert!(matches!(
            store.apply(Mutation::room_upserted(
                room_named("r1", "v1"),
                Version::new(1)
            )),
            ApplyResult::RejectedStale
        ));
        assert!(store
            .apply(Mutation::room_upserted(room_named("r1", "v3"), Version::new(3)))
            .is_applied());

        let snap = store.snapshot_room(&RoomId::new("r1")).unwrap();
        assert_eq!(snap.name, "v3");
    }

    #[test]
    fn signature_domains_are_independent() {
        let store = Store::new();
        seed_room(&store, "r1");
        seed_room_version_two(&store);

        // Same version number in a different domain is not stale.
        let cursor = ReadCursor::new("r1", "u1", 1);
        assert!(store
            .apply(Mutation::read_cursor_moved(cursor, Version::new(2)))
            .is_applied());
    }

    fn seed_room_version_two(store: &Store) {
        assert!(store
            .apply(Mutation::room_upserted(
                room_named("r1", "renamed"),
                Version::new(2)
            ))
            .is_applied());
    }

    #[test]
    fn malformed_does_not_advance_version() {
        let store = Store::new();

        // Message into a room the store does not hold.
        let message = Message::new("m1", "r1", "u1", "hi", 10);
        let result = store.apply(Mutation::message_posted(message.clone(), Version::new(1)));
        assert!(matches!(result, ApplyResult::RejectedMalformed(_)));
        assert_eq!(store.current_state().revision(), 0);

        seed_room(&store, "r1");

        // The same version must still be accepted once well-formed.
        let result = store.apply(Mutation::message_posted(message, Version::new(1)));
        assert!(result.is_applied());
        assert!(store.snapshot_message(&MessageId::new("m1")).is_some());
    }

    #[test]
    fn structurally_invalid_payload_is_malformed() {
        let store = Store::new();
        let result = store.apply(Mutation::room_upserted(room_named("", "x"), Version::new(1)));
        assert!(matches!(result, ApplyResult::RejectedMalformed(_)));
        assert_eq!(store.stats().malformed_rejections, 1);
    }

    #[test]
    fn listener_sees_each_state_once_and_none_after_unregister() {
        let store = Store::new();
        let sub = store.register();
        assert_eq!(sub.initial.revision(), 0);

        for version in 1..=3 {
            store.apply(Mutation::room_upserted(
                room_named("r1", &format!("name-{version}")),
                Version::new(version),
            ));
        }

        store.unregister(sub.id);

        for version in 4..=5 {
            store.apply(Mutation::room_upserted(
                room_named("r1", &format!("name-{version}")),
                Version::new(version),
            ));
        }

        let mut revisions = Vec::new();
        while let Ok(state) = sub.receiver.try_recv() {
            revisions.push(state.revision());
        }
        assert_eq!(revisions, vec![1, 2, 3]);
    }

    #[test]
    fn unregister_unknown_listener_is_a_noop() {
        let store = Store::new();
        let sub = store.register();
        store.unregister(sub.id);
        store.unregister(sub.id);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutations() {
        let store = Store::new();
        seed_room(&store, "r1");

        let before = store.snapshot_room(&RoomId::new("r1")).unwrap();
        let state_before = store.current_state();

        store.apply(Mutation::room_upserted(
            room_named("r1", "renamed"),
            Version::new(5),
        ));

        assert_eq!(before.name, "seeded");
        assert_eq!(
            state_before.room(&RoomId::new("r1")).unwrap().name,
            "seeded"
        );
    }

    #[test]
    fn room_removal_cascades() {
        let store = Store::new();
        seed_room(&store, "r1");
        store.apply(Mutation::user_upserted(
            User::new("u1", "Ada"),
            Version::new(1),
        ));
        store.apply(Mutation::message_posted(
            Message::new("m1", "r1", "u1", "hi", 10),
            Version::new(2),
        ));
        store.apply(Mutation::read_cursor_moved(
            ReadCursor::new("r1", "u1", 1),
            Version::new(1),
        ));

        let result = store.apply(Mutation::room_removed(RoomId::new("r1"), Version::new(1)));
        let state = result.state().unwrap();

        assert!(state.room(&RoomId::new("r1")).is_none());
        assert_eq!(state.message_count(), 0);
        assert!(state
            .read_cursor(&RoomId::new("r1"), &UserId::new("u1"))
            .is_none());
        // Users are not room-scoped and survive.
        assert!(state.user(&UserId::new("u1")).is_some());
    }

    #[test]
    fn message_removal_is_idempotent() {
        let store = Store::new();
        seed_room(&store, "r1");
        store.apply(Mutation::message_posted(
            Message::new("m1", "r1", "u1", "hi", 10),
            Version::new(2),
        ));

        let result = store.apply(Mutation::message_removed(
            RoomId::new("r1"),
            MessageId::new("m1"),
            Version::new(3),
        ));
        assert!(result.is_applied());
        assert!(store.snapshot_message(&MessageId::new("m1")).is_none());

        // Removing a message the store never held is an accepted no-op,
        // so redelivered deletions cannot wedge the domain.
        let result = store.apply(Mutation::message_removed(
            RoomId::new("r1"),
            MessageId::new("m-unknown"),
            Version::new(4),
        ));
        assert!(result.is_applied());
    }

    #[test]
    fn membership_adjusts_member_count() {
        let store = Store::new();
        seed_room(&store, "r1");

        store.apply(Mutation::membership_changed(
            RoomId::new("r1"),
            UserId::new("u1"),
            true,
            Version::new(1),
        ));
        store.apply(Mutation::membership_changed(
            RoomId::new("r1"),
            UserId::new("u2"),
            true,
            Version::new(2),
        ));
        store.apply(Mutation::membership_changed(
            RoomId::new("r1"),
            UserId::new("u1"),
            false,
            Version::new(1),
        ));

        let snap = store.snapshot_room(&RoomId::new("r1")).unwrap();
        assert_eq!(snap.member_count, 1);
    }

    #[test]
    fn message_sender_is_prefetched_in_state() {
        let store = Store::new();
        seed_room(&store, "r1");
        store.apply(Mutation::user_upserted(
            User::new("u1", "Ada"),
            Version::new(1),
        ));
        store.apply(Mutation::message_posted(
            Message::new("m1", "r1", "u1", "hi", 10),
            Version::new(2),
        ));

        let state = store.current_state();
        let message = state.message(&MessageId::new("m1")).unwrap();
        assert_eq!(
            message.sender.as_ref().map(|s| s.display_name.as_str()),
            Some("Ada")
        );
    }

    #[test]
    fn connection_status_flows_into_state() {
        let store = Store::new();
        let sub = store.register();

        store.set_connection_status(ConnectionStatus::Connected);
        let state = sub.receiver.recv().unwrap();
        assert!(state.connection().is_connected());

        // Setting the same status again publishes nothing.
        store.set_connection_status(ConnectionStatus::Connected);
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn accepted_writes_reach_the_backing() {
        let backing = Arc::new(InMemoryBacking::new());
        let store = Store::with_backing(Arc::clone(&backing) as Arc<dyn StateBacking>);

        seed_room(&store, "r1");
        store.apply(Mutation::user_upserted(
            User::new("u1", "Ada"),
            Version::new(1),
        ));
        store.apply(Mutation::message_posted(
            Message::new("m1", "r1", "u1", "hi", 10),
            Version::new(2),
        ));

        assert_eq!(
            backing.keys(),
            vec![
                "message/m1".to_string(),
                "room/r1".to_string(),
                "user/u1".to_string()
            ]
        );

        let bytes = backing.get("room/r1").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["kind"], "room");
        assert_eq!(value["name"], "seeded");

        store.apply(Mutation::room_removed(RoomId::new("r1"), Version::new(1)));
        assert_eq!(backing.keys(), vec!["user/u1".to_string()]);
    }

    #[test]
    fn rejected_mutations_never_reach_the_backing() {
        let backing = Arc::new(InMemoryBacking::new());
        let store = Store::with_backing(Arc::clone(&backing) as Arc<dyn StateBacking>);

        let result = store.apply(Mutation::message_posted(
            Message::new("m1", "ghost", "u1", "hi", 10),
            Version::new(1),
        ));
        assert!(matches!(result, ApplyResult::RejectedMalformed(_)));
        assert!(backing.is_empty());
    }

    struct FailingBacking;

    impl StateBacking for FailingBacking {
        fn put(&self, _key: &str, _bytes: Vec<u8>) -> StoreResult<()> {
            Err(StoreError::backing("disk full"))
        }

        fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::backing("disk full"))
        }

        fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    #[test]
    fn backing_failure_is_counted_not_fatal() {
        let store = Store::with_backing(Arc::new(FailingBacking));

        let result = store.apply(Mutation::room_upserted(
            room_named("r1", "A"),
            Version::new(1),
        ));

        // The in-memory merge stands; the failure is only counted.
        assert!(result.is_applied());
        assert!(store.snapshot_room(&RoomId::new("r1")).is_some());
        assert_eq!(store.stats().backing_failures, 1);
        assert_eq!(store.stats().applied, 1);
    }

    #[test]
    fn stats_track_outcomes() {
        let store = Store::new();
        seed_room(&store, "r1");
        store.apply(
            Mutation::room_upserted(room_named("r1", "again"), Version::new(1))
                .with_signature(VersionSignature::InitialState),
        );
        store.apply(Mutation::message_posted(
            Message::new("m1", "ghost", "u1", "hi", 10),
            Version::new(1),
        ));

        let stats = store.stats();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.stale_rejections, 1);
        assert_eq!(stats.malformed_rejections, 1);
        assert_eq!(stats.backing_failures, 0);
    }
}
