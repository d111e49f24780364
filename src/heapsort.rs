use crate::Element;

/// Fallback for quicksort inputs that keep producing imbalanced partitions.
/// In-place, `O(n * log(n))` worst case, not stable.
pub(crate) fn heapsort<E: Element>(v: &mut [E]) {
    let len = v.len();

    for i in (0..len / 2).rev() {
        sift_down(v, i);
    }

    for i in (1..len).rev() {
        v.swap(0, i);
        sift_down(&mut v[..i], 0);
    }
}

fn sift_down<E: Element>(v: &mut [E], mut node: usize) {
    loop {
        let mut child = 2 * node + 1;
        if child >= v.len() {
            break;
        }

        if child + 1 < v.len() && v[child] < v[child + 1] {
            child += 1;
        }

        if v[node] >= v[child] {
            break;
        }

        v.swap(node, child);
        node = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_adversarial_orderings() {
        let mut v: Vec<u64> = (0..100).rev().collect();
        heapsort(&mut v);
        assert_eq!(v, (0..100).collect::<Vec<u64>>());

        let mut v: Vec<u64> = (0..101).map(|i| (i * 31) % 13).collect();
        let mut expect = v.clone();
        expect.sort();
        heapsort(&mut v);
        assert_eq!(v, expect);
    }
}
