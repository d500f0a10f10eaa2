//! Property tests for weighted space division.

use proptest::prelude::*;
use stroke_layout::{Dimension, distribute};

fn arb_dimension() -> impl Strategy<Value = Dimension> {
    (0usize..6, 0usize..12, 0usize..20, 0usize..4)
        .prop_map(|(min, pref, max, weight)| Dimension::new(min, pref, min + max, weight))
}

proptest! {
    #[test]
    fn division_respects_bounds(
        dims in prop::collection::vec(arb_dimension(), 1..6),
        available in 0usize..64,
    ) {
        let min_total: usize = dims.iter().map(|d| d.min).sum();
        match distribute(&dims, available) {
            None => prop_assert!(min_total > available),
            Some(sizes) => {
                prop_assert_eq!(sizes.len(), dims.len());
                let total: usize = sizes.iter().sum();
                prop_assert!(total <= available);
                for (size, dim) in sizes.iter().zip(&dims) {
                    prop_assert!(*size >= dim.min);
                    prop_assert!(*size <= dim.max);
                }
                // When the growable capacity covers the available space,
                // every cell is handed out (weight-0 children never grow).
                let growable_max: usize = dims
                    .iter()
                    .map(|d| if d.weight > 0 { d.max } else { d.min })
                    .sum();
                if growable_max >= available {
                    prop_assert_eq!(total, available.max(min_total).min(available));
                }
            }
        }
    }

    #[test]
    fn division_is_deterministic(
        dims in prop::collection::vec(arb_dimension(), 1..6),
        available in 0usize..64,
    ) {
        prop_assert_eq!(distribute(&dims, available), distribute(&dims, available));
    }
}
