//! Insertion sorts and the stable in-scratch base case.

use crate::Element;

/// Insertion sort without a lower-bound check in the shift loop.
///
/// SAFETY: `base` must be valid for `len` reads and writes, and the slot
/// directly before `base` must hold a value less than or equal to every
/// element in the range. The scratch sentinel provides that for whole chunks;
/// inside quicksort, the pivot left behind by the enclosing partition does.
/// The guard slot is only ever read, never written.
pub(crate) unsafe fn insertion_sort_guarded<E: Element>(base: *mut E, len: usize) {
    for i in 1..len {
        let val = *base.add(i);
        let mut hole = base.add(i);

        // Stops at the guard slot at the latest, no index check needed.
        while *hole.sub(1) > val {
            *hole = *hole.sub(1);
            hole = hole.sub(1);
        }
        *hole = val;
    }
}

/// Plain bounded insertion sort. Stable. Used for run formation in the
/// stable configuration, where no guard value precedes every run.
pub(crate) fn insertion_sort<E: Element>(v: &mut [E]) {
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && v[j - 1] > v[j] {
            v.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Stable base case: forms short sorted runs by insertion sort, then merges
/// them with a bottom-up doubling merge confined to scratch memory,
/// ping-ponging between the chunk half and `tmp`.
///
/// The `<=` comparison in the merge keeps equal keys in input order, which is
/// the whole point of this configuration.
pub(crate) fn sort_chunk_stable<E: Element>(v: &mut [E], tmp: &mut [E], run_len: usize) {
    let n = v.len();
    debug_assert!(tmp.len() >= n);
    debug_assert!(run_len >= 1);

    if n < 2 {
        return;
    }

    for run in v.chunks_mut(run_len) {
        insertion_sort(run);
    }

    let mut width = run_len;
    let mut in_v = true;
    while width < n {
        if in_v {
            merge_pass(&*v, &mut tmp[..n], width);
        } else {
            merge_pass(&tmp[..n], v, width);
        }
        in_v = !in_v;
        width *= 2;
    }

    if !in_v {
        v.copy_from_slice(&tmp[..n]);
    }
}

fn merge_pass<E: Element>(src: &[E], dst: &mut [E], width: usize) {
    let n = src.len();
    let mut s = 0;
    while s < n {
        let mid = (s + width).min(n);
        let end = (s + 2 * width).min(n);
        merge_two(&src[s..mid], &src[mid..end], &mut dst[s..end]);
        s = end;
    }
}

fn merge_two<E: Element>(a: &[E], b: &[E], dst: &mut [E]) {
    debug_assert_eq!(a.len() + b.len(), dst.len());

    let mut i = 0;
    let mut j = 0;
    let mut k = 0;
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            dst[k] = a[i];
            i += 1;
        } else {
            dst[k] = b[j];
            j += 1;
        }
        k += 1;
    }

    let a_rest = a.len() - i;
    dst[k..k + a_rest].copy_from_slice(&a[i..]);
    dst[k + a_rest..].copy_from_slice(&b[j..]);
}
