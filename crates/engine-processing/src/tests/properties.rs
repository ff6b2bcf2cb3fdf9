use super::mocks::{MockDestination, MockSource, query, source_row, unreadable_row};
use crate::{coordinator::TransferCoordinator, mapper::RowMapper};
use engine_core::{retry::RetryPolicy, state::TransferState};
use model::core::value::Value;
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build test runtime")
        .block_on(future)
}

proptest! {
    #[test]
    fn counters_and_batches_stay_consistent(
        readable in prop::collection::vec(any::<bool>(), 0..120),
        batch_size in 1_usize..16,
    ) {
        let rows = readable
            .iter()
            .enumerate()
            .map(|(n, ok)| if *ok { source_row(n, Value::Int(n as i64)) } else { unreadable_row(n) })
            .collect();
        let dest = MockDestination::new();

        let outcome = block_on(
            TransferCoordinator::new(
                MockSource::new(rows),
                dest.clone(),
                query(),
                RowMapper::default(),
                batch_size,
                RetryPolicy::default(),
            )
            .run(),
        );

        let mapped = readable.iter().filter(|ok| **ok).count() as u64;
        let stats = outcome.stats;

        prop_assert_eq!(outcome.state, TransferState::Done);
        prop_assert_eq!(stats.rows_read(), readable.len() as u64);
        prop_assert_eq!(stats.rows_mapped() + stats.rows_skipped(), stats.rows_read());
        prop_assert_eq!(stats.rows_mapped(), mapped);
        prop_assert_eq!(stats.tuples_committed(), mapped);
        prop_assert_eq!(stats.batches_committed(), mapped.div_ceil(batch_size as u64));
        prop_assert!(dest.batch_sizes().iter().all(|size| *size <= batch_size && *size > 0));
    }
}
