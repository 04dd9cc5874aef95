//! Forward neighbor offsets for [`Lattice::with_offsets`](super::Lattice::with_offsets).
//!
//! Only forward directions are listed; the backward neighbor of each offset is
//! its negation, so an offset set of size `k` gives coordination number `2k`.

/// One unit vector per dimension: square (2D), simple cubic (3D), ...
pub fn hypercubic(n_dims: usize) -> Vec<Vec<isize>> {
    (0..n_dims)
        .map(|d| {
            let mut v = vec![0isize; n_dims];
            v[d] = 1;
            v
        })
        .collect()
}

/// Triangular lattice in skewed coordinates, coordination number 6.
pub fn triangular() -> Vec<Vec<isize>> {
    vec![vec![1, 0], vec![0, 1], vec![1, -1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypercubic_is_identity() {
        assert_eq!(hypercubic(3), vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]);
        assert!(hypercubic(0).is_empty());
    }
}
