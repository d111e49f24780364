//! The unstable base case: quicksort over a chunk resident in scratch memory.

use std::slice;

use rand::rngs::StdRng;

use crate::config::SortConfig;
use crate::heapsort;
use crate::pivot;
use crate::smallsort;
use crate::Element;

/// Sorts a chunk in place in scratch memory.
///
/// SAFETY: `base` must be valid for `len` reads and writes, and the slot
/// directly before `base` must hold a value less than or equal to every
/// element (the scratch sentinel). That slot is only ever read.
pub(crate) unsafe fn sort_chunk<E: Element>(
    base: *mut E,
    len: usize,
    cfg: &SortConfig,
    rng: &mut StdRng,
) {
    if len < 2 {
        return;
    }

    if len <= cfg.insertion_threshold {
        smallsort::insertion_sort_guarded(base, len);
        return;
    }

    // Limit the number of imbalanced partitions to `2 * floor(log2(len))`
    // before falling back to heapsort, guaranteeing `O(n * log(n))`
    // worst-case. The binary OR by one eliminates the zero check in the
    // logarithm.
    let limit = 2 * (len | 1).ilog2();

    quicksort(base, len, cfg, rng, limit);
}

/// SAFETY: as for [`sort_chunk`]; additionally every recursive range keeps
/// the guard invariant, because the pivot left at a partition boundary is
/// less than or equal to everything right of it.
unsafe fn quicksort<E: Element>(
    mut base: *mut E,
    mut len: usize,
    cfg: &SortConfig,
    rng: &mut StdRng,
    mut limit: u32,
) {
    loop {
        if len <= cfg.insertion_threshold {
            smallsort::insertion_sort_guarded(base, len);
            return;
        }

        if limit == 0 {
            heapsort::heapsort(slice::from_raw_parts_mut(base, len));
            return;
        }
        limit -= 1;

        let pivot_idx = pivot::choose_pivot(base, len, cfg.pivot_policy, rng);
        let mid = partition(base, len, pivot_idx);

        let left_len = mid;
        let right_len = len - mid - 1;

        // Recurse into the shorter side only, iterate on the longer one.
        // Bounds the recursion depth regardless of partition quality.
        if left_len < right_len {
            quicksort(base, left_len, cfg, rng, limit);
            base = base.add(mid + 1);
            len = right_len;
        } else {
            quicksort(base.add(mid + 1), right_len, cfg, rng, limit);
            len = left_len;
        }
    }
}

/// Hoare-style partition. The pivot is swapped to the right boundary where it
/// doubles as the sentinel for the left-to-right scan; the guard slot before
/// `base` stops the right-to-left scan. Neither inner loop carries a bounds
/// check.
///
/// Returns the pivot's final index; everything left of it is `<=` the pivot,
/// everything right of it `>=`.
unsafe fn partition<E: Element>(base: *mut E, len: usize, pivot_idx: usize) -> usize {
    debug_assert!(len >= 2 && pivot_idx < len);

    let last = base.add(len - 1);
    std::ptr::swap(base.add(pivot_idx), last);
    let pivot = *last;

    let mut l = base.sub(1);
    let mut r = last;

    loop {
        loop {
            l = l.add(1);
            if *l >= pivot {
                break;
            }
        }
        loop {
            r = r.sub(1);
            if pivot >= *r {
                break;
            }
        }

        if l >= r {
            break;
        }

        std::ptr::swap(l, r);
    }

    std::ptr::swap(l, last);
    l.offset_from(base) as usize
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::config::PivotPolicy;

    fn sort_with(policy: PivotPolicy, mut v: Vec<u64>) {
        let mut expect = v.clone();
        expect.sort();

        // Guard slot up front, as the scratch region provides.
        let mut buf = vec![u64::MIN];
        buf.extend_from_slice(&v);

        let cfg = SortConfig {
            pivot_policy: policy,
            ..SortConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        unsafe {
            sort_chunk(buf.as_mut_ptr().add(1), v.len(), &cfg, &mut rng);
        }

        v.copy_from_slice(&buf[1..]);
        assert_eq!(v, expect, "policy {policy:?}");
    }

    #[test]
    fn all_pivot_policies_sort() {
        let mut rng = StdRng::seed_from_u64(113);
        let random: Vec<u64> = (0..1500).map(|_| rng.gen::<u32>() as u64).collect();

        for policy in [
            PivotPolicy::Rightmost,
            PivotPolicy::Middle,
            PivotPolicy::MedianOfThree,
            PivotPolicy::Random,
            PivotPolicy::MedianOfThreeRandom,
        ] {
            sort_with(policy, random.clone());
            sort_with(policy, (0..800).collect());
            sort_with(policy, (0..800).rev().collect());
            sort_with(policy, vec![7; 500]);
        }
    }
}
