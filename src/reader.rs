use crate::bulk::BulkOffset;
use crate::dma::{self, align_elems};
use crate::Element;

/// Streaming cursor over one sorted run in bulk storage.
///
/// The reader keeps a window of the run in its scratch buffer and refills it
/// lazily with aligned block transfers. Advancing has two variants: the
/// partial advance is a pure pointer move inside the loaded window, the full
/// advance additionally triggers the refill when the window is spent. The
/// merge hot loop stays on the partial path for as long as
/// [`guaranteed`](Self::guaranteed) permits, which is what makes unrolling
/// without per-iteration reload checks possible.
///
/// Run start and run length must be multiples of the alignment unit; every
/// refill is then alignment-exact by construction.
pub(crate) struct RunReader<'a, E: Element> {
    base: *const E,
    buf: &'a mut [E],
    /// Bulk index of the next element to load.
    next_fill: usize,
    /// Bulk index one past the run's last element.
    until: usize,
    /// Cursor and valid prefix inside `buf`.
    pos: usize,
    loaded: usize,
    /// Progress through the run.
    consumed: usize,
    len: usize,
}

impl<'a, E: Element> RunReader<'a, E> {
    pub fn new(base: *const E, from: BulkOffset, until: BulkOffset, buf: &'a mut [E]) -> Self {
        let unit = align_elems::<E>();
        debug_assert!(from.index() <= until.index());
        debug_assert!(from.index() % unit == 0 && until.index() % unit == 0);

        let len = until.index() - from.index();
        let mut reader = Self {
            base,
            buf,
            next_fill: from.index(),
            until: until.index(),
            pos: 0,
            loaded: 0,
            consumed: 0,
            len,
        };

        if len > 0 {
            reader.refill();
        }

        reader
    }

    fn refill(&mut self) {
        let n = (self.until - self.next_fill).min(self.buf.len());
        debug_assert!(n > 0);

        unsafe {
            dma::get(
                self.base,
                BulkOffset::new(self.next_fill),
                self.buf.as_mut_ptr(),
                n,
            );
        }

        self.next_fill += n;
        self.pos = 0;
        self.loaded = n;
    }

    /// Current element, no I/O.
    #[inline]
    pub fn peek(&self) -> E {
        debug_assert!(!self.is_exhausted());
        self.buf[self.pos]
    }

    /// Full advance: moves on and refills the window when it is spent.
    #[inline]
    pub fn advance(&mut self) {
        debug_assert!(!self.is_exhausted());
        self.pos += 1;
        self.consumed += 1;

        if self.pos == self.loaded && self.next_fill < self.until {
            self.refill();
        }
    }

    /// Partial advance: pure window move. The caller must have checked
    /// [`guaranteed`](Self::guaranteed) and must [`settle`](Self::settle)
    /// before the next peek once the budget is spent.
    #[inline]
    pub fn advance_unchecked(&mut self) {
        debug_assert!(self.pos < self.loaded);
        self.pos += 1;
        self.consumed += 1;
    }

    /// Re-establishes the window invariant after a run of partial advances.
    #[inline]
    pub fn settle(&mut self) {
        if self.pos == self.loaded && self.next_fill < self.until {
            self.refill();
        }
    }

    /// How many advances are guaranteed to stay inside the loaded window.
    /// This is the precomputed early end the unrolled merge relies on.
    #[inline]
    pub fn guaranteed(&self) -> usize {
        self.loaded - self.pos
    }

    /// True once every element of the run has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.consumed == self.len
    }

    /// Elements not yet consumed, including the current one.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.consumed
    }

    /// Bulk address of the current element, for handing a reader off to a
    /// verbatim block copy.
    #[inline]
    pub fn tell(&self) -> BulkOffset {
        BulkOffset::new(self.next_fill - (self.loaded - self.pos))
    }

    /// Whether the window cursor sits on an alignment boundary, i.e. whether
    /// the rest of the window may leave via a direct block transfer.
    #[inline]
    pub fn window_pos_aligned(&self) -> bool {
        self.pos % align_elems::<E>() == 0
    }

    /// The loaded but unconsumed tail of the window.
    #[inline]
    pub fn window_rest(&self) -> &[E] {
        &self.buf[self.pos..self.loaded]
    }

    #[inline]
    pub fn bulk_base(&self) -> *const E {
        self.base
    }
}
