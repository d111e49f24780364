//! External sorting of fixed-width unsigned integers across a two-tier memory
//! hierarchy: a large, slow bulk-storage tier holding the full array and a
//! small, fast per-worker scratch tier. All data movement between the tiers
//! goes through a block-transfer primitive with hard size and alignment
//! constraints, modeled after a hardware DMA engine.
//!
//! The pipeline: a base-case sorter produces initial sorted runs in bulk
//! storage, a streaming run-merge engine doubles run length pass by pass, and
//! a binary tournament combines per-worker sub-ranges into one sorted array.
//! The caller learns from the returned flip flag which of the two bulk arrays
//! holds the result.

use std::fmt::Debug;
use std::thread;

mod bulk;
mod config;
mod dma;
mod heapsort;
mod merge;
mod pivot;
mod quicksort;
mod reader;
mod scratch;
mod smallsort;
mod tournament;

pub use bulk::{BulkArray, BulkOffset};
pub use config::{MergeMode, PivotPolicy, SortConfig};
pub use dma::{stats, ALIGN_BYTES, MAX_TRANSFER_BYTES};
pub use scratch::ScratchRegion;
pub use tournament::Range;

use tournament::{Handshake, SingleThreaded, Worker};

/// A sortable key. Fixed-width unsigned integer, chosen once per
/// instantiation; there is no payload.
///
/// `SENTINEL` must compare less than or equal to every value of the type and
/// `PAD` greater than or equal to every value. The sentinel guards the slot
/// directly before each scratch buffer, the pad value fills the dummy
/// elements appended past the logical array end so that every block transfer
/// stays aligned.
pub trait Element: Copy + Ord + Debug + Send + Sync + 'static {
    const SENTINEL: Self;
    const PAD: Self;
}

impl Element for u32 {
    const SENTINEL: Self = u32::MIN;
    const PAD: Self = u32::MAX;
}

impl Element for u64 {
    const SENTINEL: Self = u64::MIN;
    const PAD: Self = u64::MAX;
}

/// Sorts the logical contents of `bulk` with a single worker.
///
/// `aux` is the auxiliary bulk array of equal capacity that full-space merge
/// passes ping-pong into and half-space merges stage through. Returns the
/// flip flag: `false` means the sorted data ended up in `bulk`, `true` means
/// it ended up in `aux`. Dummy pad elements occupy `[len, padded_len)` of the
/// result array.
///
/// Configuration violations and broken transfer contracts abort via panic,
/// there is no recoverable error in this core.
pub fn sort<E: Element>(bulk: &mut BulkArray<E>, aux: &mut BulkArray<E>, cfg: &SortConfig) -> bool {
    sort_all(bulk, aux, cfg, 1)
}

/// Multi-worker entry point. `workers` must be a power of two (at most 64).
///
/// Bulk storage is partitioned into contiguous per-worker ranges. Each worker
/// sorts its range privately, then the workers run a binary tournament of
/// pairwise merges until worker 0 holds the fully sorted array. Returns the
/// reconciled flip flag, see [`sort`].
pub fn sort_all<E: Element>(
    bulk: &mut BulkArray<E>,
    aux: &mut BulkArray<E>,
    cfg: &SortConfig,
    workers: usize,
) -> bool {
    cfg.validate::<E>();
    assert!(
        workers >= 1 && workers.is_power_of_two() && workers <= 64,
        "worker count must be a power of two in 1..=64, got {workers}"
    );
    assert_eq!(
        bulk.padded_len(),
        aux.padded_len(),
        "primary and auxiliary arrays must have equal capacity"
    );

    if bulk.len() == 0 {
        return false;
    }

    bulk.reset_padding();

    let plan = tournament::plan(bulk.padded_len(), workers, cfg);

    if workers == 1 {
        let worker = Worker::new(0, plan.ranges[0], cfg);
        return tournament::run_worker(worker, bulk, aux, cfg, &plan, &SingleThreaded, 1);
    }

    let sync = Handshake::new(workers);
    let bulk_ref: &BulkArray<E> = bulk;
    let aux_ref: &BulkArray<E> = aux;
    let plan_ref = &plan;
    let sync_ref = &sync;

    let mut flip = false;
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            handles.push(s.spawn(move || {
                let worker = Worker::new(id, plan_ref.ranges[id], cfg);
                tournament::run_worker(worker, bulk_ref, aux_ref, cfg, plan_ref, sync_ref, workers)
            }));
        }

        // Worker 0 ends up covering the whole array, its flag is the result.
        for (id, handle) in handles.into_iter().enumerate() {
            let worker_flip = handle.join().unwrap();
            if id == 0 {
                flip = worker_flip;
            }
        }
    });

    flip
}

/// Convenience wrapper: stages a plain slice through a bulk-array pair and
/// copies the sorted result back. Used by the test harness and benchmarks.
pub fn sort_slice<E: Element>(v: &mut [E], cfg: &SortConfig) {
    sort_slice_parallel(v, cfg, 1);
}

/// Like [`sort_slice`] but sorting with `workers` parallel workers.
pub fn sort_slice_parallel<E: Element>(v: &mut [E], cfg: &SortConfig, workers: usize) {
    let mut bulk = BulkArray::from_slice(v);
    let mut aux = BulkArray::with_capacity(v.len());

    let flip = sort_all(&mut bulk, &mut aux, cfg, workers);

    let result = if flip { &mut aux } else { &mut bulk };
    v.copy_from_slice(result.as_slice());
}
