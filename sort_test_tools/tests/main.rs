use sort_test_tools::instantiate_sort_tests;
use sort_test_tools::Sort;

struct SortImpl {}

impl Sort for SortImpl {
    fn name() -> String {
        "rust_std_stable".into()
    }

    fn sort_u64(v: &mut [u64]) {
        v.sort();
    }

    fn sort_u32(v: &mut [u32]) {
        v.sort();
    }
}

instantiate_sort_tests!(SortImpl);
