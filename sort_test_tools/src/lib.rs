/// Interface the test and benchmark harnesses program against. The external
/// sort is monomorphized per key width, so the trait exposes one entry point
/// per supported width instead of a generic one.
pub trait Sort {
    fn name() -> String;

    fn sort_u64(v: &mut [u64]);

    fn sort_u32(v: &mut [u32]);
}

pub mod patterns;
