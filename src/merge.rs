//! The run merge engine: streams two adjacent sorted runs out of bulk
//! storage through a pair of readers and writes the merged run back through
//! an output cache, one aligned block transfer per flush.
//!
//! Per merge the state machine is simply streaming, then flushing the
//! remainder of whichever run survived, then done. Alignment is handled
//! structurally: cache flushes are either full (the cache length is an
//! alignment multiple) or final (the total output length is one), so no
//! repair writes exist anywhere.

use crate::bulk::{BulkArray, BulkOffset};
use crate::dma;
use crate::reader::RunReader;
use crate::scratch::ScratchRegion;
use crate::Element;

/// Unroll factor of the streaming hot loop. Times the element size this is
/// itself an alignment multiple, which keeps the unrolled body compatible
/// with every transfer boundary.
pub(crate) const UNROLL: usize = 8;

/// Destination cursor plus output cache. Elements accumulate in scratch
/// memory and leave as whole block transfers.
struct MergeDest<'a, E: Element> {
    base: *mut E,
    cursor: usize,
    cache: &'a mut [E],
    fill: usize,
}

impl<'a, E: Element> MergeDest<'a, E> {
    fn new(base: *mut E, at: BulkOffset, cache: &'a mut [E]) -> Self {
        Self {
            base,
            cursor: at.index(),
            cache,
            fill: 0,
        }
    }

    #[inline]
    fn space(&self) -> usize {
        self.cache.len() - self.fill
    }

    #[inline]
    fn push(&mut self, val: E) {
        self.cache[self.fill] = val;
        self.fill += 1;
        if self.fill == self.cache.len() {
            self.flush();
        }
    }

    /// Append without the flush check; the caller reserved space via
    /// [`space`](Self::space).
    #[inline]
    fn push_unchecked(&mut self, val: E) {
        debug_assert!(self.fill < self.cache.len());
        self.cache[self.fill] = val;
        self.fill += 1;
    }

    #[inline]
    fn flush_if_full(&mut self) {
        if self.fill == self.cache.len() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.fill > 0 {
            unsafe {
                dma::put_large(
                    self.cache.as_ptr(),
                    self.base,
                    BulkOffset::new(self.cursor),
                    self.fill,
                );
            }
            self.cursor += self.fill;
            self.fill = 0;
        }
    }
}

/// Streams both readers into `dest` until one run is exhausted, then drains
/// the other. `<=` prefers run `a` on equal keys; that keeps the merge stable
/// when both inputs were formed stably.
fn merge_streams<'a, E: Element>(
    a: &mut RunReader<'a, E>,
    b: &mut RunReader<'a, E>,
    dest: &mut MergeDest<E>,
) {
    loop {
        let safe = a.guaranteed().min(b.guaranteed()).min(dest.space());

        if safe >= UNROLL {
            // Hot path: the precomputed early end guarantees that neither
            // reader reloads and the cache cannot overflow for UNROLL
            // iterations, so the body runs without any of those checks.
            for _ in 0..UNROLL {
                let take_b = b.peek() < a.peek();
                let src = if take_b { &mut *b } else { &mut *a };
                dest.push_unchecked(src.peek());
                src.advance_unchecked();
            }
            a.settle();
            b.settle();
            dest.flush_if_full();
            continue;
        }

        if a.is_exhausted() {
            drain(b, dest);
            return;
        }
        if b.is_exhausted() {
            drain(a, dest);
            return;
        }

        let take_b = b.peek() < a.peek();
        let src = if take_b { &mut *b } else { &mut *a };
        dest.push(src.peek());
        src.advance();
    }
}

/// Flushes the remainder of the surviving run. As soon as the cache is empty
/// at a block boundary and the reader's window cursor is aligned, the rest
/// moves as verbatim block copies with no comparisons; until then elements
/// trickle through the cache one aligned chunk at a time.
fn drain<E: Element>(r: &mut RunReader<E>, dest: &mut MergeDest<E>) {
    loop {
        if r.is_exhausted() {
            // Final flush; its length is aligned because the total output
            // length is.
            dest.flush();
            return;
        }

        if dest.fill == 0 && r.window_pos_aligned() {
            let rest = r.window_rest();
            let rest_len = rest.len();
            if !rest.is_empty() {
                unsafe {
                    dma::put_large(
                        rest.as_ptr(),
                        dest.base,
                        BulkOffset::new(dest.cursor),
                        rest_len,
                    );
                }
                dest.cursor += rest_len;
            }

            // The loaded window ends exactly where the unread part of the
            // run begins.
            let from = r.tell().add(rest_len);
            let unread = r.remaining() - rest_len;
            if unread > 0 {
                unsafe {
                    dma::copy_bulk(
                        r.bulk_base(),
                        from,
                        dest.base,
                        BulkOffset::new(dest.cursor),
                        unread,
                        dest.cache,
                    );
                }
                dest.cursor += unread;
            }
            return;
        }

        dest.push(r.peek());
        r.advance();
    }
}

/// Full-space merge of the adjacent runs `[start, start + len1)` and
/// `[start + len1, start + len1 + len2)` from `src` into `dst` at `start`.
pub(crate) fn merge_adjacent_full<E: Element>(
    src: &BulkArray<E>,
    dst: &BulkArray<E>,
    start: usize,
    len1: usize,
    len2: usize,
    scratch: &mut ScratchRegion<E>,
) {
    debug_assert!(len1 > 0 && len2 > 0);

    let (buf_a, buf_b, cache) = scratch.merge_views();

    let mut a = RunReader::new(
        src.base() as *const E,
        BulkOffset::new(start),
        BulkOffset::new(start + len1),
        buf_a,
    );
    let mut b = RunReader::new(
        src.base() as *const E,
        BulkOffset::new(start + len1),
        BulkOffset::new(start + len1 + len2),
        buf_b,
    );
    let mut dest = MergeDest::new(dst.base(), BulkOffset::new(start), cache);

    merge_streams(&mut a, &mut b, &mut dest);
}

/// Half-space merge: run 1 is first staged into the auxiliary array at the
/// same offset, run 2 stays in place, and the merged output overwrites the
/// original region from `start` on. The destination cursor trails run 2's
/// loaded frontier by construction (every written element was consumed from
/// one of the runs), so nothing unread is ever overwritten.
pub(crate) fn merge_adjacent_half<E: Element>(
    bulk: &BulkArray<E>,
    aux: &BulkArray<E>,
    start: usize,
    len1: usize,
    len2: usize,
    scratch: &mut ScratchRegion<E>,
) {
    debug_assert!(len1 > 0 && len2 > 0);

    let (buf_a, buf_b, cache) = scratch.merge_views();

    unsafe {
        dma::copy_bulk(
            bulk.base() as *const E,
            BulkOffset::new(start),
            aux.base(),
            BulkOffset::new(start),
            len1,
            cache,
        );
    }

    let mut a = RunReader::new(
        aux.base() as *const E,
        BulkOffset::new(start),
        BulkOffset::new(start + len1),
        buf_a,
    );
    let mut b = RunReader::new(
        bulk.base() as *const E,
        BulkOffset::new(start + len1),
        BulkOffset::new(start + len1 + len2),
        buf_b,
    );
    let mut dest = MergeDest::new(bulk.base(), BulkOffset::new(start), cache);

    merge_streams(&mut a, &mut b, &mut dest);
}

/// Verbatim copy of `[start, start + len)` from `src` to `dst`, for the lone
/// trailing run of a full-space pass.
pub(crate) fn copy_region<E: Element>(
    src: &BulkArray<E>,
    dst: &BulkArray<E>,
    start: usize,
    len: usize,
    scratch: &mut ScratchRegion<E>,
) {
    debug_assert!(len > 0);

    unsafe {
        dma::copy_bulk(
            src.base() as *const E,
            BulkOffset::new(start),
            dst.base(),
            BulkOffset::new(start),
            len,
            scratch.cache(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortConfig;

    fn small_cfg() -> SortConfig {
        SortConfig {
            scratch_len: 64,
            reader_len: 8,
            ..SortConfig::default()
        }
    }

    fn merge_full_case(run1: Vec<u64>, run2: Vec<u64>) {
        let mut expect = [run1.clone(), run2.clone()].concat();
        expect.sort();

        let src = {
            let mut v = run1.clone();
            v.extend_from_slice(&run2);
            let mut arr = BulkArray::from_slice(&v);
            arr.reset_padding();
            arr
        };
        let mut dst = BulkArray::<u64>::with_capacity(src.len());
        let mut scratch = ScratchRegion::new(&small_cfg());

        merge_adjacent_full(&src, &dst, 0, run1.len(), run2.len(), &mut scratch);

        assert_eq!(dst.as_slice(), expect.as_slice());
        assert!(scratch.sentinel_intact());
    }

    #[test]
    fn merges_regardless_of_which_run_ends_higher() {
        // Run 1 ends above run 2 and vice versa, exercising both exhaustion
        // orders and the verbatim-remainder path.
        let low: Vec<u64> = (0..64).map(|i| i * 2).collect();
        let high: Vec<u64> = (100..164).collect();

        merge_full_case(low.clone(), high.clone());
        merge_full_case(high, low);
    }

    #[test]
    fn merges_interleaved_runs() {
        let evens: Vec<u64> = (0..128).map(|i| i * 2).collect();
        let odds: Vec<u64> = (0..128).map(|i| i * 2 + 1).collect();

        merge_full_case(evens, odds);
    }

    #[test]
    fn half_space_merge_writes_back_in_place() {
        let run1: Vec<u64> = (0..96).map(|i| i * 3).collect();
        let run2: Vec<u64> = (0..96).map(|i| i * 2 + 1).collect();
        let mut expect = [run1.clone(), run2.clone()].concat();
        expect.sort();

        let mut v = run1.clone();
        v.extend_from_slice(&run2);
        let mut bulk = BulkArray::from_slice(&v);
        let aux = BulkArray::<u64>::with_capacity(v.len());
        let mut scratch = ScratchRegion::new(&small_cfg());

        merge_adjacent_half(&bulk, &aux, 0, run1.len(), run2.len(), &mut scratch);

        assert_eq!(bulk.as_slice(), expect.as_slice());
    }
}
