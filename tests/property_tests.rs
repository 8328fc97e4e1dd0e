//! Property-based tests using proptest
//!
//! Kernel arithmetic, index plans and permutation cycles:
//! - SAXPY is exactly one multiply then one add per visited element
//! - Stencil boundaries copy `b*x` and never read out of range
//! - Dot product is the strictly ordered running sum
//! - Random cycles visit every index exactly once
//! - Min/median trial reduction ignores sample order

use hwprobe::kernels::{
    dot, mul, saxpy, saxpy_indexed, stencil3, strided_span, IndexPlan, StencilCoeffs,
};
use hwprobe::permutation::{cycle_length, random_cycle, shuffled_order};
use hwprobe::stats;
use hwprobe::timer::Reduction;
use proptest::prelude::*;

fn values(max_len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0e3f32..1.0e3, 0..max_len)
}

// ============================================================================
// THROUGHPUT KERNEL PROPERTIES
// ============================================================================

proptest! {
    /// Every visited element is a*x + y, every other element is untouched
    #[test]
    fn prop_saxpy_exact(
        xs in values(200),
        a in -10.0f32..10.0,
        stride in 1usize..5,
    ) {
        let len = xs.len();
        let n = if len == 0 { 0 } else { (len - 1) / stride + 1 };
        let ys: Vec<f32> = xs.iter().map(|v| v * 0.5 + 1.0).collect();
        let mut out = ys.clone();
        saxpy(n, a, &xs, &mut out, stride);

        for k in 0..len {
            if k % stride == 0 {
                prop_assert_eq!(out[k].to_bits(), (a * xs[k] + ys[k]).to_bits());
            } else {
                prop_assert_eq!(out[k].to_bits(), ys[k].to_bits());
            }
        }
    }

    /// Dot product equals the ordered fold over visited elements
    #[test]
    fn prop_dot_ordered(xs in values(300), stride in 1usize..4) {
        let ys: Vec<f32> = xs.iter().rev().copied().collect();
        let n = xs.len() / stride;
        let mut expected = 0.0f32;
        for i in 0..n {
            expected += xs[i * stride] * ys[i * stride];
        }
        prop_assert_eq!(dot(n, &xs, &ys, stride).to_bits(), expected.to_bits());
    }

    /// Multiply writes only z
    #[test]
    fn prop_mul_exact(xs in values(100)) {
        let ys: Vec<f32> = xs.iter().map(|v| v - 3.0).collect();
        let mut zs = vec![0.0f32; xs.len()];
        mul(xs.len(), &xs, &ys, &mut zs, 1);
        for k in 0..xs.len() {
            prop_assert_eq!(zs[k].to_bits(), (xs[k] * ys[k]).to_bits());
        }
    }

    /// Boundaries copy b*x; interior follows the 3-point formula
    #[test]
    fn prop_stencil_boundaries(xs in prop::collection::vec(-1.0e3f64..1.0e3, 1..100)) {
        let c = StencilCoeffs::default();
        let n = xs.len();
        let mut ys = vec![f64::NAN; n];
        stencil3(n, c, &xs, &mut ys, 1);

        prop_assert_eq!(ys[0].to_bits(), (c.b * xs[0]).to_bits());
        prop_assert_eq!(ys[n - 1].to_bits(), (c.b * xs[n - 1]).to_bits());
        for i in 1..n.saturating_sub(1) {
            let expected = c.a * xs[i - 1] + c.b * xs[i] + c.c * xs[i + 1];
            prop_assert_eq!(ys[i].to_bits(), expected.to_bits());
        }
    }

    /// Strided span covers exactly the last visited element
    #[test]
    fn prop_strided_span(n in 0usize..1000, stride in 1usize..16) {
        let span = strided_span(n, stride);
        if n == 0 {
            prop_assert_eq!(span, 0);
        } else {
            prop_assert_eq!(span, (n - 1) * stride + 1);
        }
    }
}

// ============================================================================
// INDEX PLAN AND PERMUTATION PROPERTIES
// ============================================================================

proptest! {
    /// Following the successor map n times returns to the start after visiting all
    #[test]
    fn prop_random_cycle_is_single(n in 1usize..2000, seed in any::<u64>(), start_frac in 0.0f64..1.0) {
        let next = random_cycle(n, seed).unwrap();
        let start = ((n as f64 * start_frac) as usize).min(n - 1);

        let mut seen = vec![false; n];
        let mut cur = start;
        for _ in 0..n {
            prop_assert!(!seen[cur]);
            seen[cur] = true;
            cur = next[cur] as usize;
        }
        prop_assert_eq!(cur, start);
        prop_assert!(seen.iter().all(|&s| s));
        prop_assert_eq!(cycle_length(&next, start), Some(n));
    }

    /// The random pattern's order is a permutation of 0..n
    #[test]
    fn prop_shuffled_order_is_permutation(n in 0usize..500, seed in any::<u64>()) {
        let mut order = shuffled_order(n, seed);
        order.sort_unstable();
        prop_assert_eq!(order, (0..n).collect::<Vec<_>>());
    }

    /// Random-plan SAXPY updates every element exactly once
    #[test]
    fn prop_random_plan_touches_each_once(n in 1usize..300, seed in any::<u64>()) {
        let x = vec![1.0f32; n];
        let mut y = vec![2.0f32; n];
        saxpy_indexed(1.0, &x, &mut y, &IndexPlan::Random(shuffled_order(n, seed)));
        prop_assert!(y.iter().all(|&v| v == 3.0));
    }
}

// ============================================================================
// TRIAL REDUCTION PROPERTIES
// ============================================================================

fn trial_sets() -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
    prop::collection::vec(0u64..1_000_000, 1..64)
        .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
}

proptest! {
    /// Minimum is the first sorted sample for any ordering
    #[test]
    fn prop_min_reduction_order_free((trials, shuffled) in trial_sets()) {
        let mut sorted = trials.clone();
        sorted.sort_unstable();
        prop_assert_eq!(stats::min(&shuffled), Some(sorted[0]));
        prop_assert_eq!(Reduction::Min.apply(&shuffled), Reduction::Min.apply(&trials));
    }

    /// Median is a central sorted sample for any ordering
    #[test]
    fn prop_median_reduction_order_free((trials, shuffled) in trial_sets()) {
        let mut sorted = trials.clone();
        sorted.sort_unstable();
        let k = sorted.len();
        let m = stats::median(&shuffled).unwrap();
        if k % 2 == 1 {
            prop_assert_eq!(m, sorted[k / 2]);
        } else {
            prop_assert!(m == sorted[k / 2 - 1] || m == sorted[k / 2]);
        }
        prop_assert_eq!(Reduction::Median.apply(&shuffled), Some(m));
        prop_assert_eq!(stats::median(&trials), Some(m));
    }
}

#[test]
fn test_zero_length_kernels_are_no_ops() {
    let empty: [f32; 0] = [];
    let mut out: [f32; 0] = [];
    saxpy(0, 2.0, &empty, &mut out, 1);
    mul(0, &empty, &empty, &mut out, 3);
    stencil3(0, StencilCoeffs::default(), &empty, &mut out, 1);
    assert_eq!(dot(0, &empty, &empty, 1), 0.0);
    assert!(random_cycle(0, 1).unwrap().is_empty());
}

#[test]
fn test_stencil_single_element() {
    let c = StencilCoeffs::default();
    let x = [3.0f64, 100.0, 100.0];
    let mut y = [0.0f64; 3];
    stencil3(1, c, &x, &mut y, 1);
    assert_eq!(y[0], c.b * 3.0);
    assert_eq!(&y[1..], &[0.0, 0.0]);
}
