use rand::rngs::StdRng;
use rand::Rng;

use crate::config::PivotPolicy;
use crate::Element;

/// Selects a pivot index in `[0, len)` according to `policy`.
///
/// SAFETY: `base` must be valid for `len` reads and `len >= 2`.
pub(crate) unsafe fn choose_pivot<E: Element>(
    base: *const E,
    len: usize,
    policy: PivotPolicy,
    rng: &mut StdRng,
) -> usize {
    debug_assert!(len >= 2);

    match policy {
        PivotPolicy::Rightmost => len - 1,
        PivotPolicy::Middle => len / 2,
        PivotPolicy::MedianOfThree => median3_idx(base, 0, len / 2, len - 1),
        PivotPolicy::Random => rng.gen_range(0..len),
        PivotPolicy::MedianOfThreeRandom => {
            let a = rng.gen_range(0..len);
            let b = rng.gen_range(0..len);
            let c = rng.gen_range(0..len);
            median3_idx(base, a, b, c)
        }
    }
}

/// Index of the median of three elements. Compiler tends to make the
/// selection branchless when sensible.
///
/// SAFETY: `a`, `b`, `c` must be in-bounds indices for `base`.
unsafe fn median3_idx<E: Element>(base: *const E, a: usize, b: usize, c: usize) -> usize {
    let va = *base.add(a);
    let vb = *base.add(b);
    let vc = *base.add(c);

    let x = vb < va;
    let y = vc < va;
    let z = vc < vb;

    [a, b, c][(x == y) as usize + (y != z) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median3_picks_the_middle_value() {
        let perms: [[u64; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];

        for v in perms {
            let idx = unsafe { median3_idx(v.as_ptr(), 0, 1, 2) };
            assert_eq!(v[idx], 2, "input {v:?}");
        }
    }
}
