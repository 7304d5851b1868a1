//! Property tests for version ordering and counter exactness.

use chatsync_model::{Mutation, Room, RoomId, Version};
use chatsync_store::{ApplyResult, ProgressCounter, Store};
use proptest::prelude::*;

fn rename(store: &Store, version: u64) -> ApplyResult {
    store.apply(Mutation::room_upserted(
        Room::new("r1", format!("name-{version}")),
        Version::new(version),
    ))
}

proptest! {
    /// Whatever the interleaving, the entity ends up holding the payload
    /// of the highest version in its signature domain.
    #[test]
    fn highest_version_payload_wins(versions in prop::collection::vec(1u64..50, 1..20)) {
        let store = Store::new();
        for version in &versions {
            rename(&store, *version);
        }

        let max = versions.iter().max().copied().unwrap();
        let snap = store.snapshot_room(&RoomId::new("r1")).unwrap();
        prop_assert_eq!(snap.name, format!("name-{max}"));
    }

    /// Replaying an entire delivery a second time rejects every mutation
    /// as stale and leaves the state untouched.
    #[test]
    fn replaying_a_sequence_changes_nothing(versions in prop::collection::vec(1u64..50, 1..20)) {
        let store = Store::new();
        for version in &versions {
            rename(&store, *version);
        }
        let revision_before = store.current_state().revision();

        for version in &versions {
            prop_assert!(matches!(rename(&store, *version), ApplyResult::RejectedStale));
        }
        prop_assert_eq!(store.current_state().revision(), revision_before);
    }

    /// For any split of outcomes, exactly the final report observes
    /// completion.
    #[test]
    fn counter_finishes_exactly_once(outcomes in prop::collection::vec(any::<bool>(), 1..12)) {
        let counter = ProgressCounter::new(outcomes.len());
        let mut finishes = 0usize;

        for (index, success) in outcomes.iter().enumerate() {
            let finished = if *success {
                counter.increment_success().unwrap()
            } else {
                counter.increment_failure().unwrap()
            };
            if finished {
                finishes += 1;
                prop_assert_eq!(index, outcomes.len() - 1);
            }
        }

        prop_assert_eq!(finishes, 1);
        prop_assert!(counter.is_finished());
    }
}
