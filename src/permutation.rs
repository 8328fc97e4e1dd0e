//! Index permutations for random access patterns and pointer chasing

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::{HwprobeError, Result};

/// Uniformly shuffled ordering of `0..n`
///
/// Used as the `offset = permutation[i]` table of the random access pattern.
/// Fixed points are allowed and the result need not form a single cycle.
#[must_use]
pub fn shuffled_order(n: usize, seed: u64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    idx
}

/// Successor table forming one cycle through all `n` indices
///
/// The visiting order is shuffled, then each index points at the next one
/// in shuffled order and the last wraps to the first. Chaining a shuffled
/// order (instead of shuffling successors directly) rules out sub-cycles.
///
/// # Errors
///
/// [`HwprobeError::InvalidConfig`] when `n` does not fit the `u32` entries.
pub fn random_cycle(n: usize, seed: u64) -> Result<Vec<u32>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    if u32::try_from(n - 1).is_err() {
        return Err(HwprobeError::config(
            "entries",
            format!("{n} entries exceed the u32 index range"),
        ));
    }

    let mut order: Vec<u32> = (0..n).map(|i| i as u32).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut next = vec![0_u32; n];
    for pair in order.windows(2) {
        next[pair[0] as usize] = pair[1];
    }
    next[order[n - 1] as usize] = order[0];
    Ok(next)
}

/// Number of hops needed to return to `start`, or `None` if it never does
/// within `next.len()` hops
#[must_use]
pub fn cycle_length(next: &[u32], start: usize) -> Option<usize> {
    let mut cur = start;
    for hop in 1..=next.len() {
        cur = next[cur] as usize;
        if cur == start {
            return Some(hop);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_cycle_single_cycle() {
        for n in [1_usize, 2, 3, 17, 1000] {
            let next = random_cycle(n, 123_456_789).unwrap();
            assert_eq!(next.len(), n);
            for start in [0, n / 2, n - 1] {
                assert_eq!(cycle_length(&next, start), Some(n), "n={n} start={start}");
            }
        }
    }

    #[test]
    fn test_random_cycle_empty() {
        assert!(random_cycle(0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_random_cycle_deterministic() {
        assert_eq!(random_cycle(64, 7).unwrap(), random_cycle(64, 7).unwrap());
        assert_ne!(random_cycle(64, 7).unwrap(), random_cycle(64, 8).unwrap());
    }

    #[test]
    fn test_shuffled_order_is_permutation() {
        let mut p = shuffled_order(500, 12345);
        assert_eq!(p.len(), 500);
        p.sort_unstable();
        assert!(p.iter().enumerate().all(|(i, &v)| i == v));
    }

    #[test]
    fn test_cycle_length_detects_subcycle() {
        // 0 -> 1 -> 0, 2 -> 3 -> 2
        let next = [1_u32, 0, 3, 2];
        assert_eq!(cycle_length(&next, 0), Some(2));
        assert_ne!(cycle_length(&next, 0), Some(next.len()));
    }
}
