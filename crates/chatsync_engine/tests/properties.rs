//! Property tests: how a delivery is partitioned into pages never
//! changes the merged result.

use chatsync_engine::{Backfill, MockPageSource, Page, PageCursor};
use chatsync_model::Mutation;
use chatsync_store::Store;
use chatsync_testkit::generators::initial_rooms_strategy;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #[test]
    fn page_partitioning_is_invisible(
        mutations in initial_rooms_strategy(16),
        chunk in 1usize..6,
    ) {
        // Apply the whole sequence directly.
        let direct = Store::new();
        for mutation in mutations.clone() {
            direct.apply(mutation);
        }

        // Apply the same sequence split into pages.
        let source = MockPageSource::new();
        let chunks: Vec<&[Mutation]> = mutations.chunks(chunk).collect();
        for (index, page_mutations) in chunks.iter().enumerate() {
            if index + 1 == chunks.len() {
                source.push_page(Page::last(page_mutations.to_vec()));
            } else {
                source.push_page(Page::new(
                    page_mutations.to_vec(),
                    PageCursor::new(format!("p{index}")),
                ));
            }
        }

        let paged = Arc::new(Store::new());
        let summary = Backfill::new(Arc::clone(&paged), source).run().unwrap();
        prop_assert_eq!(summary.pages as usize, chunks.len());

        let direct_state = direct.current_state();
        let paged_state = paged.current_state();
        prop_assert_eq!(paged_state.room_count(), direct_state.room_count());
        for room in direct_state.rooms() {
            prop_assert_eq!(paged_state.room(&room.id), Some(room));
        }
    }
}
