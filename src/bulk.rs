use std::cell::UnsafeCell;

use crate::dma::align_elems;
use crate::Element;

/// Index of an element in bulk storage.
///
/// Deliberately a distinct type from scratch-side indices: a bulk offset must
/// never be dereferenced directly, data only crosses the tier boundary
/// through the block-transfer primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BulkOffset(usize);

impl BulkOffset {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn add(self, n: usize) -> Self {
        Self(self.0 + n)
    }
}

/// One array in the slow bulk-storage tier.
///
/// The allocation is padded up to the transfer alignment unit; the dummy pad
/// slots hold `E::PAD` so they sort past every logical element and keep all
/// block transfers alignment-exact.
///
/// The array is `Sync` even though workers write through shared references:
/// the tournament coordinator assigns disjoint ranges and only ever widens a
/// range after the previous owner signaled completion, so no two workers
/// touch overlapping offsets. Nothing else protects the storage.
pub struct BulkArray<E: Element> {
    storage: UnsafeCell<Box<[E]>>,
    len: usize,
    padded_len: usize,
}

unsafe impl<E: Element> Sync for BulkArray<E> {}

impl<E: Element> BulkArray<E> {
    /// Creates an array with a logical length of `len`, pre-filled with pad
    /// elements.
    pub fn with_capacity(len: usize) -> Self {
        let unit = align_elems::<E>();
        let padded_len = len.div_ceil(unit) * unit;
        let storage = vec![E::PAD; padded_len].into_boxed_slice();

        Self {
            storage: UnsafeCell::new(storage),
            len,
            padded_len,
        }
    }

    pub fn from_slice(v: &[E]) -> Self {
        let mut arr = Self::with_capacity(v.len());
        arr.as_mut_slice().copy_from_slice(v);
        arr
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity including the dummy pad slots, a multiple of the alignment
    /// unit.
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.padded_len
    }

    /// The logical contents. Takes `&mut self` because shared references may
    /// be aliased by in-flight workers.
    pub fn as_slice(&mut self) -> &[E] {
        &self.storage.get_mut()[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [E] {
        &mut self.storage.get_mut()[..self.len]
    }

    /// Rewrites the pad slots. Called once before sorting starts; the pad
    /// elements then travel through the sort like ordinary keys and end up at
    /// the tail again.
    pub(crate) fn reset_padding(&mut self) {
        let len = self.len;
        for slot in &mut self.storage.get_mut()[len..] {
            *slot = E::PAD;
        }
    }

    /// Raw base pointer for the transfer primitive. Callers must respect the
    /// range-disjointness invariant.
    #[inline]
    pub(crate) fn base(&self) -> *mut E {
        unsafe { (*self.storage.get()).as_mut_ptr() }
    }
}
