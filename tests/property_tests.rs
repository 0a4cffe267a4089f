//! Property-based tests for batching and pagination
//!
//! These tests verify, for arbitrary tables and sizes, that:
//! - Concatenated batches reproduce the row stream exactly
//! - Every batch but the last is full
//! - The paginator yields ceil(N/p) pages and then stops
//! - The average age does not depend on how the rows were grouped

mod common;

use common::seeded_with_ages;
use proptest::prelude::*;
use prodev::core::{ProdevError, Result};
use prodev::record::Record;
use prodev::stream::{average_age, batches, lazy_paginate, stream_batches, stream_rows};

fn arb_ages() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..120, 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn batches_concatenate_to_rows(ages in arb_ages(), batch_size in 1usize..16) {
        let fixture = seeded_with_ages(&ages);
        let rows: Vec<Record> = stream_rows(&fixture.server, |rows| rows.collect::<Result<_>>()).unwrap();
        let grouped: Vec<Vec<Record>> =
            stream_batches(&fixture.server, batch_size, |b| b.collect::<Result<_>>()).unwrap();

        if let Some((last, full)) = grouped.split_last() {
            prop_assert!(full.iter().all(|b| b.len() == batch_size));
            prop_assert!(!last.is_empty() && last.len() <= batch_size);
        }
        prop_assert_eq!(grouped.concat(), rows);
    }

    #[test]
    fn paginator_page_count(ages in arb_ages(), page_size in 1usize..16) {
        let fixture = seeded_with_ages(&ages);
        let sizes: Vec<usize> = lazy_paginate(&fixture.server, page_size)
            .map(|p| p.map(|p| p.len()))
            .collect::<Result<_>>()
            .unwrap();

        let n = ages.len();
        prop_assert_eq!(sizes.len(), (n + page_size - 1) / page_size);
        if let Some(last) = sizes.last() {
            let expected = if n % page_size == 0 { page_size } else { n % page_size };
            prop_assert_eq!(*last, expected);
        }
        prop_assert_eq!(sizes.iter().sum::<usize>(), n);
    }

    #[test]
    fn average_is_batch_invariant(ages in prop::collection::vec(0u32..120, 0..200), batch_size in 1usize..32) {
        let direct = average_age(ages.iter().copied().map(Ok::<u32, ProdevError>)).unwrap();
        let regrouped = average_age(
            batches(ages.iter().copied().map(Ok::<u32, ProdevError>), batch_size)
                .flat_map(|b| b.unwrap().into_iter().map(Ok::<u32, ProdevError>)),
        )
        .unwrap();
        prop_assert_eq!(direct, regrouped);
    }
}
