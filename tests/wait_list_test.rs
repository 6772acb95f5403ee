/*!
 * Wait List Property Tests
 *
 * Checks the pooled list against a VecDeque model under random operations
 */

use fastsync::{SyncConfig, WaitList};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Push(u16),
    Shift,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => any::<u16>().prop_map(Op::Push),
        4 => Just(Op::Shift),
        1 => Just(Op::Clear),
    ]
}

fn run_against_model(config: &SyncConfig, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut list = WaitList::with_config(config);
    let mut model = VecDeque::new();

    for op in ops {
        match op {
            Op::Push(value) => {
                list.push(*value);
                model.push_back(*value);
            }
            Op::Shift => prop_assert_eq!(list.shift(), model.pop_front()),
            Op::Clear => {
                list.clear();
                model.clear();
            }
        }

        prop_assert_eq!(list.len(), model.len());
        prop_assert_eq!(list.is_empty(), model.is_empty());
        prop_assert!(list.iter().eq(model.iter()));
    }

    let drained: Vec<_> = list.drain().collect();
    prop_assert_eq!(drained, Vec::from(model));
    prop_assert!(list.is_empty());
    Ok(())
}

proptest! {
    #[test]
    fn test_pooled_list_matches_fifo_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        run_against_model(&SyncConfig::high_churn(), &ops)?;
    }

    #[test]
    fn test_unpooled_list_matches_fifo_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        run_against_model(&SyncConfig::low_churn(), &ops)?;
    }
}

#[test]
fn test_pool_stops_growing_under_steady_churn() {
    let mut list = WaitList::with_config(&SyncConfig::default());
    for round in 0..10 {
        for n in 0..8 {
            list.push(round * 8 + n);
        }
        for _ in 0..8 {
            list.shift();
        }
    }
    assert!(list.is_empty());
    assert_eq!(list.pooled_nodes(), 8);
}
