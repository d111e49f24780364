use crate::dma::{align_elems, MAX_TRANSFER_BYTES};
use crate::Element;

/// Pivot selection policy for the base-case quicksort.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PivotPolicy {
    /// Rightmost element of the slice.
    Rightmost,
    /// Middle element of the slice.
    Middle,
    /// Median of the first, middle and last element.
    MedianOfThree,
    /// Uniformly random element.
    Random,
    /// Median of three uniformly random elements.
    MedianOfThreeRandom,
}

/// How a merge pass uses the auxiliary bulk array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// The left run is staged into the auxiliary array and the merge writes
    /// back in place. Needs roughly half an array of extra bulk storage, at
    /// the cost of one extra block copy per merge. The flip flag never
    /// toggles.
    HalfSpace,
    /// Source and destination arrays ping-pong every pass. No extra per-merge
    /// copy, needs a full second array. The flip flag toggles each pass.
    FullSpace,
}

/// Tuning and policy knobs for one sort invocation.
///
/// All lengths are in elements. The scratch region of every worker consists
/// of a general-purpose cache plus two streaming-reader buffers, allocated
/// contiguously; `scratch_len` is their combined length and doubles as the
/// base-case chunk length (halved in the stable configuration, which needs
/// ping-pong space inside scratch memory).
#[derive(Copy, Clone, Debug)]
pub struct SortConfig {
    /// Combined usable scratch length per worker.
    pub scratch_len: usize,
    /// Length of each of the two streaming-reader buffers.
    pub reader_len: usize,
    /// At or below this length the base case uses insertion sort.
    pub insertion_threshold: usize,
    /// Initial run length formed by insertion sort in the stable
    /// configuration before the in-scratch doubling merge takes over.
    pub merge_threshold: usize,
    pub pivot_policy: PivotPolicy,
    pub merge_mode: MergeMode,
    /// Replace quicksort with in-scratch merging so equal keys keep their
    /// input order. The other configurations are deliberately not stable.
    pub stable: bool,
    /// Seed for the per-worker pivot RNG. Fixed by default so runs are
    /// deterministic.
    pub seed: u64,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            scratch_len: 4096,
            reader_len: 512,
            insertion_threshold: 24,
            merge_threshold: 16,
            pivot_policy: PivotPolicy::MedianOfThree,
            merge_mode: MergeMode::FullSpace,
            stable: false,
            seed: 0xB5F2_78C1_9D03_11E7,
        }
    }
}

impl SortConfig {
    /// Length of the general-purpose cache, the part of scratch memory left
    /// over once both reader buffers are carved out.
    pub fn cache_len(&self) -> usize {
        self.scratch_len - 2 * self.reader_len
    }

    /// Base-case chunk length. The unstable configurations sort a chunk that
    /// fills the whole scratch region; the stable configuration keeps half of
    /// it as merge ping-pong space.
    pub fn block_len(&self) -> usize {
        if self.stable {
            self.scratch_len / 2
        } else {
            self.scratch_len
        }
    }

    /// Checks the configuration against the transfer contract for element
    /// type `E`. A malformed configuration is fatal and fails here, before
    /// any sorting work begins.
    pub fn validate<E: Element>(&self) {
        let unit = align_elems::<E>();

        assert!(
            self.scratch_len >= 2 * self.reader_len + unit,
            "scratch region too small: {} elements leave no cache next to two \
             reader buffers of {}",
            self.scratch_len,
            self.reader_len
        );
        assert!(
            self.scratch_len % unit == 0,
            "scratch length {} is not a multiple of the {} element alignment unit",
            self.scratch_len,
            unit
        );
        assert!(
            self.reader_len >= unit && self.reader_len % unit == 0,
            "reader buffer length {} breaks the {} element alignment unit",
            self.reader_len,
            unit
        );
        assert!(
            self.reader_len * std::mem::size_of::<E>() <= MAX_TRANSFER_BYTES,
            "reader buffer of {} elements exceeds the maximum single transfer",
            self.reader_len
        );
        if self.stable {
            assert!(
                self.scratch_len % (2 * unit) == 0,
                "stable configuration splits scratch in half, so the scratch \
                 length {} must be a multiple of {}",
                self.scratch_len,
                2 * unit
            );
        }
        assert!(
            self.insertion_threshold >= 1 && self.insertion_threshold <= self.block_len(),
            "insertion threshold {} out of range for a base-case chunk of {}",
            self.insertion_threshold,
            self.block_len()
        );
        assert!(self.merge_threshold >= 1, "merge threshold must be positive");
    }
}
