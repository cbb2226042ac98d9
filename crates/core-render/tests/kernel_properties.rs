//! Property-based checks for the fixed-point kernel builder.

use core_render::Filter;
use core_render::kernel::{FIXED_ONE, Kernel};
use proptest::prelude::*;

fn arb_filter() -> impl Strategy<Value = Filter> {
    prop_oneof![
        Just(Filter::Box),
        Just(Filter::Bilinear),
        Just(Filter::Bicubic),
        Just(Filter::Mks13),
    ]
}

proptest! {
    // Every output's fixed-point weights sum to exactly 2^14, whatever the
    // filter, the direction of the scale, or the clip offset.
    #[test]
    fn weights_sum_to_fixed_one(
        filter in arb_filter(),
        src in 1usize..512,
        dst in 1usize..512,
        offset in 0usize..64,
    ) {
        let scale = dst as f64 / src as f64;
        let k = Kernel::build(filter, src, offset.min(dst - 1), dst - offset.min(dst - 1), scale);
        for o in 0..k.outputs() {
            let (_, ws) = k.tap(o);
            let sum: i32 = ws.iter().sum();
            prop_assert_eq!(sum, FIXED_ONE);
        }
    }

    // Taps never reference inputs outside the source, and the recorded
    // min/max band brackets every tap.
    #[test]
    fn taps_stay_in_bounds(
        filter in arb_filter(),
        src in 1usize..256,
        dst in 1usize..256,
    ) {
        let scale = dst as f64 / src as f64;
        let k = Kernel::build(filter, src, 0, dst, scale);
        for o in 0..k.outputs() {
            let (start, ws) = k.tap(o);
            prop_assert!(!ws.is_empty());
            prop_assert!(start >= k.min_input());
            prop_assert!(start + ws.len() - 1 <= k.max_input());
            prop_assert!(start + ws.len() <= src);
        }
        prop_assert!(k.max_input() < src);
    }

    // The trimming rule: no output starts or ends with a zero weight unless
    // it is the only tap.
    #[test]
    fn zero_taps_are_trimmed(
        filter in arb_filter(),
        src in 2usize..256,
        dst in 2usize..256,
    ) {
        let scale = dst as f64 / src as f64;
        let k = Kernel::build(filter, src, 0, dst, scale);
        for o in 0..k.outputs() {
            let (_, ws) = k.tap(o);
            if ws.len() > 1 {
                prop_assert_ne!(ws[0], 0);
                prop_assert_ne!(*ws.last().unwrap(), 0);
            }
        }
    }
}
