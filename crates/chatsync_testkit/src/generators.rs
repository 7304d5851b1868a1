//! Property-based test generators using proptest.
//!
//! Strategies produce valid data by construction: non-empty identifiers
//! and, for bulk sequences, versions that increase within their
//! signature domain.

use chatsync_model::{Mutation, Room, RoomId, UserId, Version, VersionSignature};
use proptest::prelude::*;

/// Strategy for valid room IDs.
pub fn room_id_strategy() -> impl Strategy<Value = RoomId> {
    prop::string::string_regex("r[a-z0-9]{1,6}")
        .expect("invalid regex")
        .prop_map(RoomId::new)
}

/// Strategy for valid user IDs.
pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    prop::string::string_regex("u[a-z0-9]{1,6}")
        .expect("invalid regex")
        .prop_map(UserId::new)
}

/// Strategy for versions.
pub fn version_strategy() -> impl Strategy<Value = Version> {
    (1u64..1000).prop_map(Version::new)
}

/// Strategy for rooms with generated names.
pub fn room_strategy() -> impl Strategy<Value = Room> {
    (
        room_id_strategy(),
        prop::string::string_regex("[a-z ]{1,16}").expect("invalid regex"),
    )
        .prop_map(|(id, name)| Room::new(id, name))
}

/// Strategy for a bulk-load sequence of room upserts.
///
/// All mutations share the `InitialState` domain with versions assigned
/// in delivery order, the shape a paged backfill produces.
pub fn initial_rooms_strategy(max_len: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(room_strategy(), 1..max_len).prop_map(|rooms| {
        rooms
            .into_iter()
            .enumerate()
            .map(|(index, room)| {
                Mutation::room_upserted(room, Version::new(index as u64 + 1))
                    .with_signature(VersionSignature::InitialState)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_ids_are_valid(id in room_id_strategy()) {
            prop_assert!(!id.is_empty());
        }

        #[test]
        fn initial_sequences_validate_and_increase(mutations in initial_rooms_strategy(12)) {
            let mut last = 0u64;
            for mutation in &mutations {
                prop_assert!(mutation.validate().is_ok());
                prop_assert_eq!(&mutation.signature, &VersionSignature::InitialState);
                prop_assert!(mutation.version.as_u64() > last);
                last = mutation.version.as_u64();
            }
        }
    }
}
