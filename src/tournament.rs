//! The tournament coordinator: splits bulk storage into contiguous per-worker
//! ranges, lets every worker sort its range privately (base-case runs plus
//! doubling merge passes) and then combines the ranges with a binary
//! tournament of pairwise merges.
//!
//! Ranges are block-aligned, so neighboring workers never share an alignment
//! unit. The tournament communicates through one-shot handshakes: a worker
//! whose round bit is set signals its partner and retires, the partner waits
//! for that signal before it touches the combined range. Worker 0 wins every
//! round and ends up owning the whole array.
//!
//! Every worker executes the same number of local passes and, in the
//! full-space mode, toggles its flip flag once per pass and once per
//! tournament round even when the work degenerates to a plain copy. That
//! keeps the flip flags of merge partners identical, so a cross merge always
//! reads both runs from the same array.

use std::sync::{Barrier, Condvar, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bulk::{BulkArray, BulkOffset};
use crate::config::{MergeMode, SortConfig};
use crate::dma;
use crate::merge;
use crate::quicksort;
use crate::scratch::ScratchRegion;
use crate::smallsort;
use crate::Element;

/// A half-open range of bulk-storage offsets, `[start, end)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Partition of the padded array plus the uniform local pass count.
pub(crate) struct Plan {
    pub ranges: Vec<Range>,
    /// Local doubling merge passes every worker runs, sized for the widest
    /// range. Workers with fewer runs degenerate the surplus passes to
    /// copies, which keeps the flip parity uniform.
    pub passes: usize,
    pub block_len: usize,
}

fn ceil_log2(x: usize) -> usize {
    debug_assert!(x >= 1);
    (usize::BITS - (x - 1).leading_zeros()) as usize
}

/// Computes the per-worker partition. Each range is a whole number of
/// base-case blocks; the trailing ranges may come up short or empty when the
/// array is small.
pub(crate) fn plan(padded_len: usize, workers: usize, cfg: &SortConfig) -> Plan {
    let block_len = cfg.block_len();
    let blocks_total = padded_len.div_ceil(block_len);
    let blocks_per_worker = blocks_total.div_ceil(workers);
    let stride = blocks_per_worker * block_len;

    let ranges = (0..workers)
        .map(|i| Range {
            start: (i * stride).min(padded_len),
            end: ((i + 1) * stride).min(padded_len),
        })
        .collect();

    Plan {
        ranges,
        passes: ceil_log2(blocks_per_worker),
        block_len,
    }
}

/// One sort worker: private scratch region, private pivot RNG, the range it
/// currently owns and its flip flag.
pub(crate) struct Worker<E: Element> {
    id: usize,
    scratch: ScratchRegion<E>,
    rng: StdRng,
    range: Range,
    flip: bool,
}

impl<E: Element> Worker<E> {
    pub fn new(id: usize, range: Range, cfg: &SortConfig) -> Self {
        Self {
            id,
            scratch: ScratchRegion::new(cfg),
            rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(id as u64)),
            range,
            flip: false,
        }
    }
}

/// Cross-worker synchronization. The single-threaded runner stubs this out;
/// the threaded one uses a barrier plus per-worker signal slots.
pub(crate) trait Synchronizer: Sync {
    fn wait_all(&self);
    /// Announces that `me` finished its subtree and `peer` may absorb it.
    fn signal(&self, me: usize, peer: usize);
    /// Blocks until `peer` has signaled `me`.
    fn wait_for(&self, me: usize, peer: usize);
}

pub(crate) struct SingleThreaded;

impl Synchronizer for SingleThreaded {
    fn wait_all(&self) {}
    fn signal(&self, _me: usize, _peer: usize) {}
    fn wait_for(&self, _me: usize, _peer: usize) {}
}

struct SignalSlot {
    /// Bitmask of workers that have signaled the slot's owner. Carrying the
    /// signaler identity keeps a fast worker from consuming a signal meant
    /// for a later round.
    mask: Mutex<u64>,
    cond: Condvar,
}

pub(crate) struct Handshake {
    barrier: Barrier,
    slots: Vec<SignalSlot>,
}

impl Handshake {
    pub fn new(workers: usize) -> Self {
        Self {
            barrier: Barrier::new(workers),
            slots: (0..workers)
                .map(|_| SignalSlot {
                    mask: Mutex::new(0),
                    cond: Condvar::new(),
                })
                .collect(),
        }
    }
}

impl Synchronizer for Handshake {
    fn wait_all(&self) {
        self.barrier.wait();
    }

    fn signal(&self, me: usize, peer: usize) {
        let slot = &self.slots[peer];
        let mut mask = slot.mask.lock().unwrap();
        *mask |= 1 << me;
        slot.cond.notify_all();
    }

    fn wait_for(&self, me: usize, peer: usize) {
        let slot = &self.slots[me];
        let mut mask = slot.mask.lock().unwrap();
        while *mask & (1 << peer) == 0 {
            mask = slot.cond.wait(mask).unwrap();
        }
        *mask &= !(1 << peer);
    }
}

/// Runs one worker to completion: base-case runs, local doubling passes, then
/// the tournament rounds it participates in. Returns the worker's final flip
/// flag; only worker 0's is meaningful to the caller.
pub(crate) fn run_worker<E: Element, S: Synchronizer>(
    mut worker: Worker<E>,
    bulk: &BulkArray<E>,
    aux: &BulkArray<E>,
    cfg: &SortConfig,
    plan: &Plan,
    sync: &S,
    worker_count: usize,
) -> bool {
    sync.wait_all();

    sort_base_chunks(&mut worker, bulk, cfg, plan.block_len);

    let mut run_len = plan.block_len;
    for _ in 0..plan.passes {
        merge_pass(&mut worker, bulk, aux, cfg, run_len);
        if cfg.merge_mode == MergeMode::FullSpace {
            worker.flip = !worker.flip;
        }
        run_len *= 2;
    }

    // Tournament: at round `mask` the survivors are the workers whose id is a
    // multiple of `mask`. The brother bit decides who absorbs whom.
    let mut mask = 1;
    while mask < worker_count {
        if worker.id & mask != 0 {
            sync.signal(worker.id, worker.id - mask);
            break;
        }

        let partner = worker.id + mask;
        sync.wait_for(worker.id, partner);

        // The partner's subtree spans its own range through the last range of
        // its round-`mask` group.
        let group_last = (partner + mask).min(worker_count) - 1;
        let partner_end = plan.ranges[group_last].end;

        cross_merge(&mut worker, bulk, aux, cfg, partner_end);
        worker.range.end = partner_end;

        mask <<= 1;
    }

    worker.flip
}

/// Loads each base-case chunk of the worker's range into scratch memory,
/// sorts it there and writes it back as an initial run.
fn sort_base_chunks<E: Element>(
    worker: &mut Worker<E>,
    bulk: &BulkArray<E>,
    cfg: &SortConfig,
    block_len: usize,
) {
    let Range { start, end } = worker.range;
    let mut chunk_start = start;

    while chunk_start < end {
        let chunk_len = block_len.min(end - chunk_start);

        if cfg.stable {
            let (chunk, tmp) = worker.scratch.stable_halves();
            unsafe {
                dma::get_large(
                    bulk.base() as *const E,
                    BulkOffset::new(chunk_start),
                    chunk.as_mut_ptr(),
                    chunk_len,
                );
            }
            smallsort::sort_chunk_stable(&mut chunk[..chunk_len], tmp, cfg.merge_threshold);
            unsafe {
                dma::put_large(
                    chunk.as_ptr(),
                    bulk.base(),
                    BulkOffset::new(chunk_start),
                    chunk_len,
                );
            }
        } else {
            let (area, cap) = worker.scratch.chunk_area();
            debug_assert!(chunk_len <= cap);
            unsafe {
                dma::get_large(
                    bulk.base() as *const E,
                    BulkOffset::new(chunk_start),
                    area,
                    chunk_len,
                );
                quicksort::sort_chunk(area, chunk_len, cfg, &mut worker.rng);
                dma::put_large(area, bulk.base(), BulkOffset::new(chunk_start), chunk_len);
            }
        }

        chunk_start += chunk_len;
    }
}

/// One doubling merge pass over the worker's range: every adjacent pair of
/// `run_len` runs becomes one run of twice the length. A lone trailing run is
/// copied in the full-space mode so the destination array ends the pass
/// complete.
fn merge_pass<E: Element>(
    worker: &mut Worker<E>,
    bulk: &BulkArray<E>,
    aux: &BulkArray<E>,
    cfg: &SortConfig,
    run_len: usize,
) {
    let Range { start: range_start, end } = worker.range;
    let mut start = range_start;

    while start < end {
        let len1 = run_len.min(end - start);
        let len2 = run_len.min(end - start - len1);

        match cfg.merge_mode {
            MergeMode::FullSpace => {
                let (src, dst) = if worker.flip { (aux, bulk) } else { (bulk, aux) };
                if len2 > 0 {
                    merge::merge_adjacent_full(src, dst, start, len1, len2, &mut worker.scratch);
                } else {
                    merge::copy_region(src, dst, start, len1, &mut worker.scratch);
                }
            }
            MergeMode::HalfSpace => {
                if len2 > 0 {
                    merge::merge_adjacent_half(bulk, aux, start, len1, len2, &mut worker.scratch);
                }
            }
        }

        start += len1 + len2;
    }
}

/// Tournament round: merges the worker's current range with the absorbed
/// partner subtree `[range.end, partner_end)`.
fn cross_merge<E: Element>(
    worker: &mut Worker<E>,
    bulk: &BulkArray<E>,
    aux: &BulkArray<E>,
    cfg: &SortConfig,
    partner_end: usize,
) {
    let start = worker.range.start;
    let len1 = worker.range.len();
    let len2 = partner_end - worker.range.end;

    match cfg.merge_mode {
        MergeMode::FullSpace => {
            let (src, dst) = if worker.flip { (aux, bulk) } else { (bulk, aux) };
            if len1 > 0 && len2 > 0 {
                merge::merge_adjacent_full(src, dst, start, len1, len2, &mut worker.scratch);
            } else if len1 + len2 > 0 {
                merge::copy_region(src, dst, start, len1 + len2, &mut worker.scratch);
            }
            // The round toggles even when there was nothing to move, flip
            // parity with the next partner depends on it.
            worker.flip = !worker.flip;
        }
        MergeMode::HalfSpace => {
            if len1 > 0 && len2 > 0 {
                merge::merge_adjacent_half(bulk, aux, start, len1, len2, &mut worker.scratch);
            }
        }
    }
}
