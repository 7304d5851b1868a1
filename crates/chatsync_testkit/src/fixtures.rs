//! Test fixtures and store helpers.
//!
//! Provides convenience builders for setting up stores and common
//! mutation sequences.

use chatsync_model::{Message, Mutation, Room, User, Version, VersionSignature};
use chatsync_store::{InMemoryBacking, StateBacking, Store};
use std::sync::Arc;

/// A test store wired to an inspectable in-memory backing.
pub struct TestStore {
    /// The store instance.
    pub store: Arc<Store>,
    /// The backing the store writes through to.
    pub backing: Arc<InMemoryBacking>,
}

impl TestStore {
    /// Creates an empty store with an in-memory backing.
    #[must_use]
    pub fn new() -> Self {
        let backing = Arc::new(InMemoryBacking::new());
        let store = Arc::new(Store::with_backing(
            Arc::clone(&backing) as Arc<dyn StateBacking>
        ));
        Self { store, backing }
    }

    /// A shared handle to the store.
    #[must_use]
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// A room upsert delivered under the `InitialState` domain.
///
/// Versions in the `InitialState` domain must increase across calls
/// within one store; pass a fresh `version` per mutation.
pub fn initial_room(id: &str, version: u64) -> Mutation {
    Mutation::room_upserted(
        Room::new(id, format!("room-{id}")),
        Version::new(version),
    )
    .with_signature(VersionSignature::InitialState)
}

/// A user upsert delivered under the `InitialState` domain.
pub fn initial_user(id: &str, name: &str, version: u64) -> Mutation {
    Mutation::user_upserted(User::new(id, name), Version::new(version))
        .with_signature(VersionSignature::InitialState)
}

/// A message post delivered under the `InitialState` domain.
pub fn initial_message(
    id: &str,
    room_id: &str,
    sender_id: &str,
    sent_at_ms: u64,
    version: u64,
) -> Mutation {
    Mutation::message_posted(
        Message::new(id, room_id, sender_id, "fixture message", sent_at_ms),
        Version::new(version),
    )
    .with_signature(VersionSignature::InitialState)
}

/// A store pre-populated with `room_count` rooms named `r1`..`rN`.
#[must_use]
pub fn seeded_store(room_count: usize) -> TestStore {
    let fixture = TestStore::new();
    for index in 1..=room_count {
        let result = fixture
            .store
            .apply(initial_room(&format!("r{index}"), index as u64));
        assert!(result.is_applied(), "seeding room r{index} failed");
    }
    fixture
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_model::RoomId;

    #[test]
    fn seeded_store_holds_rooms() {
        let fixture = seeded_store(3);
        assert_eq!(fixture.current_state().room_count(), 3);
        assert!(fixture.snapshot_room(&RoomId::new("r2")).is_some());
        // Writes flowed through to the backing.
        assert_eq!(fixture.backing.len(), 3);
    }

    #[test]
    fn initial_mutations_share_the_initial_domain() {
        let fixture = TestStore::new();
        assert!(fixture.apply(initial_room("r1", 1)).is_applied());
        assert!(fixture.apply(initial_user("u1", "Ada", 2)).is_applied());
        assert!(fixture.apply(initial_message("m1", "r1", "u1", 10, 3)).is_applied());

        // A replayed version in the same domain is stale.
        assert!(!fixture.apply(initial_room("r9", 3)).is_applied());
    }
}
