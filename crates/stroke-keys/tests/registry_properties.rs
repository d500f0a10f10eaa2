//! Property tests for registry lookup.

use proptest::prelude::*;
use std::sync::Arc;
use stroke_keys::{Binding, Key, KeyBindings, KeyBindingsBase, KeyOrChar};

fn arb_key() -> impl Strategy<Value = KeyOrChar> {
    prop_oneof![
        prop::char::range('a', 'f').prop_map(KeyOrChar::Char),
        Just(KeyOrChar::Key(Key::ControlX)),
        Just(KeyOrChar::Key(Key::Up)),
        Just(KeyOrChar::Key(Key::Any)),
    ]
}

fn arb_sequence() -> impl Strategy<Value = Vec<KeyOrChar>> {
    prop::collection::vec(arb_key(), 1..4)
}

fn matches_pointwise(binding_keys: &[KeyOrChar], input: &[KeyOrChar]) -> bool {
    binding_keys.len() == input.len()
        && binding_keys
            .iter()
            .zip(input)
            .all(|(b, i)| b.is_any() || b == i)
}

proptest! {
    // Inclusion in the exact lookup is equivalent to pointwise matching at
    // equal length, for every registered binding.
    #[test]
    fn exact_lookup_equals_pointwise_match(
        bindings in prop::collection::vec(arb_sequence(), 1..6),
        input in prop::collection::vec(arb_key().prop_filter("input has no wildcard", |k| !k.is_any()), 1..4),
    ) {
        let mut kb = KeyBindings::new();
        for keys in &bindings {
            kb.add_binding(Binding::new(keys.clone(), |_| {
                Ok(stroke_core::HandlerOutcome::Handled)
            }));
        }

        let result = kb.get_bindings_for_keys(&input);
        let expected: usize = bindings
            .iter()
            .filter(|keys| matches_pointwise(keys, &input))
            .count();
        prop_assert_eq!(result.len(), expected);
        for binding in &result {
            prop_assert!(matches_pointwise(binding.keys(), &input));
        }

        // Wildcard counts never decrease along the result list.
        let any_counts: Vec<usize> = result
            .iter()
            .map(|b| b.keys().iter().filter(|k| k.is_any()).count())
            .collect();
        prop_assert!(any_counts.windows(2).all(|w| w[0] <= w[1]));
    }

    // Strict-prefix lookup never returns a binding of equal or shorter
    // length, and every returned binding matches the input as a prefix.
    #[test]
    fn prefix_lookup_is_strict(
        bindings in prop::collection::vec(arb_sequence(), 1..6),
        input in prop::collection::vec(arb_key().prop_filter("input has no wildcard", |k| !k.is_any()), 0..3),
    ) {
        let mut kb = KeyBindings::new();
        for keys in &bindings {
            kb.add_binding(Binding::new(keys.clone(), |_| {
                Ok(stroke_core::HandlerOutcome::Handled)
            }));
        }
        for binding in kb.get_bindings_starting_with_keys(&input) {
            prop_assert!(binding.keys().len() > input.len());
            prop_assert!(
                binding.keys()[..input.len()]
                    .iter()
                    .zip(&input)
                    .all(|(b, i)| b.is_any() || b == i)
            );
        }
    }
}
