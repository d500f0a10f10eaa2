//! Property tests for the palette mapping.

use proptest::prelude::*;
use stroke_output::TwoFiftySixColorCache;

/// Reference palette, built independently of the implementation.
fn palette() -> Vec<(u8, u8, u8)> {
    const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    let mut out = Vec::with_capacity(240);
    for r in LEVELS {
        for g in LEVELS {
            for b in LEVELS {
                out.push((r, g, b));
            }
        }
    }
    for k in 0..24u16 {
        let v = (8 + 10 * k) as u8;
        out.push((v, v, v));
    }
    out
}

fn squared(a: (u8, u8, u8), b: (u8, u8, u8)) -> i64 {
    let dr = a.0 as i64 - b.0 as i64;
    let dg = a.1 as i64 - b.1 as i64;
    let db = a.2 as i64 - b.2 as i64;
    dr * dr + dg * dg + db * db
}

proptest! {
    #[test]
    fn closest_is_argmin_with_lower_index_tiebreak(r: u8, g: u8, b: u8) {
        let cache = TwoFiftySixColorCache::new();
        let got = cache.closest((r, g, b));
        prop_assert!(got >= 16);

        let palette = palette();
        let got_dist = squared((r, g, b), palette[(got - 16) as usize]);
        for (i, candidate) in palette.iter().enumerate() {
            let d = squared((r, g, b), *candidate);
            // No candidate is strictly closer, and equally-close candidates
            // sit at or after the chosen index.
            prop_assert!(d >= got_dist);
            if d == got_dist {
                prop_assert!(i >= (got - 16) as usize);
            }
        }
    }
}
