use crate::config::SortConfig;
use crate::dma::align_elems;
use crate::Element;

/// One worker's fast-memory region.
///
/// A single contiguous allocation carved into one alignment unit of guard
/// space, a general-purpose cache and two streaming-reader buffers:
///
/// ```text
/// [ guard .. sentinel | cache | reader A | reader B ]
/// ```
///
/// The sentinel occupies the slot directly before the usable area. It is
/// written once here and holds a value less than or equal to every element,
/// which lets the insertion-sort inner loop shift without a lower-bound
/// check. Sort logic must never overwrite it.
///
/// When the readers are idle, cache and reader buffers together form one
/// large base-case buffer; the merge engine instead splits them into three
/// views. Owned exclusively by one worker, never shared.
pub struct ScratchRegion<E: Element> {
    buf: Box<[E]>,
    guard: usize,
    cache_len: usize,
    reader_len: usize,
}

impl<E: Element> ScratchRegion<E> {
    /// Allocates the region and installs the sentinel. Assumes `cfg` passed
    /// validation.
    pub fn new(cfg: &SortConfig) -> Self {
        let guard = align_elems::<E>();
        let mut buf = vec![E::PAD; guard + cfg.scratch_len].into_boxed_slice();
        buf[guard - 1] = E::SENTINEL;

        Self {
            buf,
            guard,
            cache_len: cfg.cache_len(),
            reader_len: cfg.reader_len,
        }
    }

    /// Length of the combined base-case buffer.
    pub fn chunk_capacity(&self) -> usize {
        self.buf.len() - self.guard
    }

    /// The whole usable area as one raw base-case buffer. The returned
    /// pointer carries provenance over the full allocation, so the sentinel
    /// in the slot directly before it may be read.
    pub(crate) fn chunk_area(&mut self) -> (*mut E, usize) {
        let cap = self.chunk_capacity();
        (unsafe { self.buf.as_mut_ptr().add(self.guard) }, cap)
    }

    /// The usable area split in half, for the stable configuration: chunk
    /// half and merge ping-pong half.
    pub(crate) fn stable_halves(&mut self) -> (&mut [E], &mut [E]) {
        let guard = self.guard;
        let half = (self.buf.len() - guard) / 2;
        self.buf[guard..].split_at_mut(half)
    }

    /// Merge-time views: reader buffer A, reader buffer B and the output
    /// cache.
    pub(crate) fn merge_views(&mut self) -> (&mut [E], &mut [E], &mut [E]) {
        let guard = self.guard;
        let (cache, readers) = self.buf[guard..].split_at_mut(self.cache_len);
        let (buf_a, buf_b) = readers.split_at_mut(self.reader_len);
        (buf_a, buf_b, cache)
    }

    /// The cache alone, used as staging space for bulk-to-bulk copies.
    pub(crate) fn cache(&mut self) -> &mut [E] {
        let guard = self.guard;
        &mut self.buf[guard..guard + self.cache_len]
    }

    #[cfg(test)]
    pub(crate) fn sentinel_intact(&self) -> bool {
        self.buf[self.guard - 1] == E::SENTINEL
    }
}
