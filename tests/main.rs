//! Integration tests: the full oracle suite from `sort_test_tools` run
//! against a matrix of configurations, plus scenario tests for the two-tier
//! specifics (flip flag, padding, transfer alignment, multi-worker
//! tournaments).

use std::collections::HashMap;

use paste::paste;

use tiersort::{
    sort_all, sort_slice, sort_slice_parallel, stats, BulkArray, MergeMode, PivotPolicy,
    SortConfig, ALIGN_BYTES,
};

/// Generates one module per named configuration, each implementing
/// `sort_test_tools::Sort` and instantiating the whole oracle suite.
///
/// Scratch and reader sizes are kept deliberately small so the doubling
/// passes, reader refills and tournament rounds all trigger at test sizes.
macro_rules! instantiate_config_tests {
    ($name:ident, $workers:expr, $cfg:expr) => {
        paste! {
            mod [<config_ $name>] {
                use sort_test_tools::instantiate_sort_tests;
                use sort_test_tools::Sort;

                struct SortImpl {}

                impl Sort for SortImpl {
                    fn name() -> String {
                        concat!("tiersort_", stringify!($name)).into()
                    }

                    fn sort_u64(v: &mut [u64]) {
                        tiersort::sort_slice_parallel(v, &$cfg, $workers);
                    }

                    fn sort_u32(v: &mut [u32]) {
                        tiersort::sort_slice_parallel(v, &$cfg, $workers);
                    }
                }

                instantiate_sort_tests!(SortImpl);
            }
        }
    };
}

fn small_cfg() -> SortConfig {
    SortConfig {
        scratch_len: 256,
        reader_len: 32,
        ..SortConfig::default()
    }
}

instantiate_config_tests!(
    full_space_median3,
    1,
    super::SortConfig {
        merge_mode: super::MergeMode::FullSpace,
        pivot_policy: super::PivotPolicy::MedianOfThree,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(
    half_space_median3,
    1,
    super::SortConfig {
        merge_mode: super::MergeMode::HalfSpace,
        pivot_policy: super::PivotPolicy::MedianOfThree,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(
    full_space_random_pivot,
    1,
    super::SortConfig {
        merge_mode: super::MergeMode::FullSpace,
        pivot_policy: super::PivotPolicy::Random,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(
    stable_full_space,
    1,
    super::SortConfig {
        stable: true,
        merge_mode: super::MergeMode::FullSpace,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(
    four_workers_full,
    4,
    super::SortConfig {
        merge_mode: super::MergeMode::FullSpace,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(
    four_workers_half,
    4,
    super::SortConfig {
        merge_mode: super::MergeMode::HalfSpace,
        ..super::small_cfg()
    }
);

instantiate_config_tests!(full_space_default, 1, super::SortConfig::default());

// --- Scenario tests ---

#[test]
fn worked_example() {
    let mut v: Vec<u64> = vec![5, 3, 1, 4, 1, 5, 9, 2, 6];
    sort_slice(&mut v, &small_cfg());
    assert_eq!(v, vec![1, 1, 2, 3, 4, 5, 5, 6, 9]);
}

#[test]
fn empty_input_moves_no_data() {
    let mut bulk = BulkArray::<u64>::with_capacity(0);
    let mut aux = BulkArray::<u64>::with_capacity(0);

    stats::reset_thread();
    let flip = sort_all(&mut bulk, &mut aux, &small_cfg(), 1);

    assert!(!flip);
    assert_eq!(stats::thread_transfer_count(), 0);
}

#[test]
fn single_element() {
    let mut v: Vec<u64> = vec![42];
    sort_slice(&mut v, &small_cfg());
    assert_eq!(v, vec![42]);
}

#[test]
fn length_one_short_of_a_chunk() {
    let cfg = small_cfg();
    let len = cfg.scratch_len - 1;
    let mut v: Vec<u64> = (0..len as u64).rev().collect();

    sort_slice(&mut v, &cfg);

    assert_eq!(v, (0..len as u64).collect::<Vec<_>>());
}

#[test]
fn flip_flag_selects_the_result_array() {
    // 4 chunks of 256 need 2 full-space passes, so the result lands back in
    // the primary array and the flag must say so.
    let cfg = small_cfg();
    let len = 4 * cfg.scratch_len;
    let input: Vec<u64> = (0..len as u64).rev().collect();

    let mut bulk = BulkArray::from_slice(&input);
    let mut aux = BulkArray::with_capacity(len);
    let flip = sort_all(&mut bulk, &mut aux, &cfg, 1);

    assert!(!flip);
    assert_eq!(bulk.as_slice(), (0..len as u64).collect::<Vec<_>>());

    // 2 chunks need 1 pass, the result lands in the auxiliary array.
    let len = 2 * cfg.scratch_len;
    let input: Vec<u64> = (0..len as u64).rev().collect();

    let mut bulk = BulkArray::from_slice(&input);
    let mut aux = BulkArray::with_capacity(len);
    let flip = sort_all(&mut bulk, &mut aux, &cfg, 1);

    assert!(flip);
    assert_eq!(aux.as_slice(), (0..len as u64).collect::<Vec<_>>());
}

#[test]
fn half_space_never_flips() {
    let cfg = SortConfig {
        merge_mode: MergeMode::HalfSpace,
        ..small_cfg()
    };

    for chunks in [1, 2, 3, 4, 7] {
        let len = chunks * cfg.scratch_len;
        let input: Vec<u64> = (0..len as u64).rev().collect();

        let mut bulk = BulkArray::from_slice(&input);
        let mut aux = BulkArray::with_capacity(len);
        let flip = sort_all(&mut bulk, &mut aux, &cfg, 1);

        assert!(!flip);
        assert_eq!(bulk.as_slice(), (0..len as u64).collect::<Vec<_>>());
    }
}

#[test]
fn parallel_sort_preserves_the_multiset() {
    let mut v: Vec<u64> = (0..1_000u64).map(|i| (i * 379) % 83).collect();
    let mut counts_before: HashMap<u64, usize> = HashMap::new();
    for &x in &v {
        *counts_before.entry(x).or_default() += 1;
    }

    sort_slice_parallel(&mut v, &small_cfg(), 2);

    assert!(v.windows(2).all(|w| w[0] <= w[1]));

    let mut counts_after: HashMap<u64, usize> = HashMap::new();
    for &x in &v {
        *counts_after.entry(x).or_default() += 1;
    }
    assert_eq!(counts_before, counts_after);
}

#[test]
fn tournament_handles_more_workers_than_chunks() {
    // A single chunk of data spread over 8 workers leaves 7 of them idle;
    // the tournament still has to hand everything to worker 0 with a
    // consistent flip flag.
    let cfg = small_cfg();
    let len = cfg.scratch_len / 2;
    let mut v: Vec<u64> = (0..len as u64).rev().collect();

    for workers in [1, 2, 4, 8] {
        let mut w = v.clone();
        sort_slice_parallel(&mut w, &cfg, workers);
        assert_eq!(w, (0..len as u64).collect::<Vec<_>>(), "workers {workers}");
    }

    sort_slice_parallel(&mut v, &cfg, 8);
    assert_eq!(v, (0..len as u64).collect::<Vec<_>>());
}

#[test]
fn all_worker_counts_agree() {
    let cfg = small_cfg();
    let input: Vec<u64> = (0..10_000u64).map(|i| (i * 2_654_435_761) % 100_003).collect();

    let mut expect = input.clone();
    expect.sort();

    for workers in [1, 2, 4, 8, 16] {
        for mode in [MergeMode::FullSpace, MergeMode::HalfSpace] {
            let cfg = SortConfig {
                merge_mode: mode,
                ..cfg
            };
            let mut v = input.clone();
            sort_slice_parallel(&mut v, &cfg, workers);
            assert_eq!(v, expect, "workers {workers} mode {mode:?}");
        }
    }
}

#[test]
fn every_transfer_is_aligned() {
    // Odd length, so the pad machinery has to cover the trailing element.
    let cfg = small_cfg();
    let mut v: Vec<u64> = (0..2_997u64).rev().collect();

    stats::start_log();
    sort_slice(&mut v, &cfg);
    let log = stats::take_log();

    assert!(!log.is_empty());
    for bytes in log {
        assert!(bytes > 0 && bytes % ALIGN_BYTES == 0, "transfer of {bytes} bytes");
    }

    assert!(v.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn pad_values_sort_correctly_as_keys() {
    // Keys equal to the pad value must survive, the padding machinery cannot
    // eat them.
    let cfg = small_cfg();
    let mut v: Vec<u64> = vec![u64::MAX; 37];
    v[5] = 3;
    v[20] = u64::MAX - 1;

    sort_slice(&mut v, &cfg);

    assert_eq!(v[0], 3);
    assert_eq!(v[1], u64::MAX - 1);
    assert!(v[2..].iter().all(|&x| x == u64::MAX));
}

#[test]
#[should_panic(expected = "power of two")]
fn odd_worker_count_is_rejected() {
    let mut bulk = BulkArray::<u64>::with_capacity(16);
    let mut aux = BulkArray::<u64>::with_capacity(16);
    sort_all(&mut bulk, &mut aux, &small_cfg(), 3);
}

#[test]
#[should_panic(expected = "scratch region too small")]
fn undersized_scratch_is_rejected() {
    let cfg = SortConfig {
        scratch_len: 64,
        reader_len: 32,
        ..SortConfig::default()
    };
    let mut v: Vec<u64> = vec![3, 1, 2];
    sort_slice(&mut v, &cfg);
}
