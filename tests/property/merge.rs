use proptest::prelude::*;
use serde_json::{json, Map};

use semisync::{MergeMode, MergePolicy, SharedState};

fn fold(start: i64, deltas: &[i64], policy: &MergePolicy) -> SharedState {
    let mut state = SharedState::new();
    state.set("sum", start);
    for &d in deltas {
        let mut delta = Map::new();
        delta.insert("sum".to_string(), json!(d));
        state.merge(&delta, policy).unwrap();
    }
    state
}

proptest! {
    #[test]
    fn additive_merges_do_not_depend_on_completion_order(
        start in -1_000i64..1_000,
        (deltas, shuffled) in proptest::collection::vec(-1_000i64..1_000, 0..16)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        let policy = MergePolicy::default().with_field("sum", MergeMode::Add);

        let in_order = fold(start, &deltas, &policy);
        let reordered = fold(start, &shuffled, &policy);

        let expected = start + deltas.iter().sum::<i64>();
        prop_assert_eq!(in_order.get("sum"), Some(&json!(expected)));
        prop_assert_eq!(in_order, reordered);
    }

    #[test]
    fn overwrite_keeps_the_last_delta(
        values in proptest::collection::vec(any::<i64>(), 1..16),
    ) {
        let state = fold(0, &values, &MergePolicy::default());
        prop_assert_eq!(state.get("sum"), Some(&json!(values[values.len() - 1])));
    }
}
