//! Whatever order traversals finish in, the folded result and the merged
//! output must both equal the in-order concatenation of every shard.

use proptest::prelude::*;
use shard_scheduler::{MemorySink, Scheduler};
use std::sync::Arc;

use crate::common::{config, unit_provider, Concat, Piece};

fn pieces_strategy() -> impl Strategy<Value = Vec<Piece>> {
    prop::collection::vec(("[a-z]{1,3}", 0u64..4), 0..24).prop_map(|specs| {
        specs
            .into_iter()
            .map(|(text, delay_ms)| Piece::new(&text, delay_ms))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fold_and_output_match_submission_order(
        pieces in pieces_strategy(),
        pool_size in 1usize..6,
        cap in 1usize..5,
    ) {
        let expected: String = pieces.iter().map(|p| p.text.as_str()).collect();
        let count = pieces.len();
        let mut sink = MemorySink::new();

        let scheduler = Scheduler::new(config(pool_size).with_max_outstanding_merges(cap));
        let monitor = scheduler.monitor();
        let result = scheduler
            .run(Arc::new(Concat::default()), pieces, unit_provider(), &mut sink)
            .unwrap();

        if count == 0 {
            prop_assert_eq!(result, None);
        } else {
            prop_assert_eq!(result.as_deref(), Some(expected.as_str()));
        }
        prop_assert_eq!(sink.as_str(), Some(expected.as_str()));
        let expected_order: Vec<usize> = (0..count).collect();
        prop_assert_eq!(sink.order(), expected_order.as_slice());
        prop_assert_eq!(monitor.snapshot().completed_reduces, count.saturating_sub(1) as u64);
    }
}
