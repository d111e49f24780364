//! The block-transfer primitive between bulk storage and scratch memory.
//!
//! Every transfer must be a positive multiple of the alignment unit and at
//! most one maximum-transfer in size; the bulk-side element offset must sit
//! on an alignment boundary as well. Violations are fatal assertions, not
//! recoverable errors: this models a hardware DMA engine, and a caller that
//! presents an unaligned transfer has a bug. Callers keep odd trailing counts
//! away from here structurally, via the dummy padding past the logical array
//! end.

use std::mem;
use std::ptr;

use crate::bulk::BulkOffset;
use crate::Element;

/// Minimum transfer granularity in bytes.
pub const ALIGN_BYTES: usize = 16;

/// Upper bound for a single transfer.
pub const MAX_TRANSFER_BYTES: usize = 16 * 1024;

/// Alignment unit in elements.
#[inline]
pub(crate) fn align_elems<E: Element>() -> usize {
    debug_assert!(ALIGN_BYTES % mem::size_of::<E>() == 0);
    ALIGN_BYTES / mem::size_of::<E>()
}

#[inline]
pub(crate) fn max_transfer_elems<E: Element>() -> usize {
    MAX_TRANSFER_BYTES / mem::size_of::<E>()
}

#[track_caller]
fn check_transfer<E: Element>(bulk_index: usize, len: usize) {
    let unit = align_elems::<E>();

    assert!(len > 0, "zero-length block transfer");
    assert!(
        len % unit == 0,
        "transfer of {len} elements breaks the {ALIGN_BYTES} byte alignment unit"
    );
    assert!(
        bulk_index % unit == 0,
        "bulk offset {bulk_index} breaks the {ALIGN_BYTES} byte alignment unit"
    );
    assert!(
        len * mem::size_of::<E>() <= MAX_TRANSFER_BYTES,
        "transfer of {len} elements exceeds the {MAX_TRANSFER_BYTES} byte maximum"
    );

    stats::record(len * mem::size_of::<E>());
}

/// Reads `len` elements from bulk storage into scratch memory.
///
/// SAFETY: `base.add(from.index())` must be valid for `len` reads, `dst` for
/// `len` writes, and the regions must not overlap (they live in different
/// tiers).
#[inline]
pub(crate) unsafe fn get<E: Element>(base: *const E, from: BulkOffset, dst: *mut E, len: usize) {
    check_transfer::<E>(from.index(), len);
    ptr::copy_nonoverlapping(base.add(from.index()), dst, len);
}

/// Writes `len` elements from scratch memory into bulk storage.
///
/// SAFETY: `src` must be valid for `len` reads, `base.add(to.index())` for
/// `len` writes, non-overlapping.
#[inline]
pub(crate) unsafe fn put<E: Element>(src: *const E, base: *mut E, to: BulkOffset, len: usize) {
    check_transfer::<E>(to.index(), len);
    ptr::copy_nonoverlapping(src, base.add(to.index()), len);
}

/// Chunked read: splits an aligned transfer of arbitrary length into
/// maximum-sized pieces.
///
/// SAFETY: as for [`get`], over the whole length.
pub(crate) unsafe fn get_large<E: Element>(
    base: *const E,
    from: BulkOffset,
    dst: *mut E,
    len: usize,
) {
    let max = max_transfer_elems::<E>();
    let mut done = 0;
    while done < len {
        let n = (len - done).min(max);
        get(base, from.add(done), dst.add(done), n);
        done += n;
    }
}

/// Chunked write, the counterpart of [`get_large`].
///
/// SAFETY: as for [`put`], over the whole length.
pub(crate) unsafe fn put_large<E: Element>(
    src: *const E,
    base: *mut E,
    to: BulkOffset,
    len: usize,
) {
    let max = max_transfer_elems::<E>();
    let mut done = 0;
    while done < len {
        let n = (len - done).min(max);
        put(src.add(done), base, to.add(done), n);
        done += n;
    }
}

/// Bulk-to-bulk copy staged through a scratch buffer, one `via`-sized piece
/// at a time. Within a piece the read completes before the write starts, so a
/// destination trailing the source in the same array is fine.
///
/// SAFETY: source and destination regions must each be valid for `len`
/// elements; if they overlap, `to` must not be ahead of `from`.
pub(crate) unsafe fn copy_bulk<E: Element>(
    src_base: *const E,
    from: BulkOffset,
    dst_base: *mut E,
    to: BulkOffset,
    len: usize,
    via: &mut [E],
) {
    debug_assert!(!via.is_empty());

    let mut done = 0;
    while done < len {
        let n = (len - done).min(via.len());
        get_large(src_base, from.add(done), via.as_mut_ptr(), n);
        put_large(via.as_ptr(), dst_base, to.add(done), n);
        done += n;
    }
}

/// Transfer observability for tests and debugging. The sort itself never
/// reads any of this.
pub mod stats {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    thread_local! {
        static TRANSFER_COUNT: Cell<u64> = Cell::new(0);
        static TRANSFER_BYTES: Cell<u64> = Cell::new(0);
    }

    static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
    static LOG: Lazy<Mutex<Vec<usize>>> = Lazy::new(|| Mutex::new(Vec::new()));

    /// Resets the calling thread's transfer counters.
    pub fn reset_thread() {
        TRANSFER_COUNT.with(|c| c.set(0));
        TRANSFER_BYTES.with(|c| c.set(0));
    }

    /// Number of transfers issued by the calling thread since the last reset.
    pub fn thread_transfer_count() -> u64 {
        TRANSFER_COUNT.with(|c| c.get())
    }

    /// Bytes moved by the calling thread since the last reset.
    pub fn thread_transfer_bytes() -> u64 {
        TRANSFER_BYTES.with(|c| c.get())
    }

    /// Starts recording the byte size of every transfer, across all threads.
    pub fn start_log() {
        LOG.lock().unwrap().clear();
        LOG_ENABLED.store(true, Ordering::Release);
    }

    /// Stops recording and returns the captured transfer sizes.
    pub fn take_log() -> Vec<usize> {
        LOG_ENABLED.store(false, Ordering::Release);
        std::mem::take(&mut *LOG.lock().unwrap())
    }

    #[inline]
    pub(crate) fn record(bytes: usize) {
        TRANSFER_COUNT.with(|c| c.set(c.get() + 1));
        TRANSFER_BYTES.with(|c| c.set(c.get() + bytes as u64));

        if LOG_ENABLED.load(Ordering::Acquire) {
            LOG.lock().unwrap().push(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_splits_at_the_transfer_maximum() {
        let len = 3 * max_transfer_elems::<u64>() + align_elems::<u64>();
        let src: Vec<u64> = (0..len as u64).collect();
        let mut dst = vec![0u64; len];

        stats::reset_thread();
        unsafe {
            get_large(src.as_ptr(), BulkOffset::new(0), dst.as_mut_ptr(), len);
        }

        assert_eq!(dst, src);
        assert_eq!(stats::thread_transfer_count(), 4);
    }

    #[test]
    #[should_panic(expected = "alignment unit")]
    fn unaligned_transfer_is_fatal() {
        let src = [0u64; 8];
        let mut dst = [0u64; 8];

        unsafe {
            get(src.as_ptr(), BulkOffset::new(0), dst.as_mut_ptr(), 3);
        }
    }
}
