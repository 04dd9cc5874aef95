use super::offsets::hypercubic;
use super::topology::{Bond, Direction, Neighbor};
use crate::error::{Error, Result};

/// Periodic Bravais lattice with precomputed neighbor table.
///
/// Sites are indexed in row-major (C) order, see [`Lattice::linear_index`].
/// Couplings are stored in a flat array of length `n_spins * n_neighbors`,
/// where element `i * n_neighbors + d` is the weight of the bond from site `i`
/// to its forward neighbor in direction `d`.
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Extent along each dimension (e.g. `[8, 8, 8]`).
    pub shape: Vec<usize>,
    /// Row-major strides: `strides[d] = product of shape[d+1..]`.
    pub strides: Vec<usize>,
    /// Total number of sites (`shape.iter().product()`).
    pub n_spins: usize,
    /// Number of spatial dimensions (`shape.len()`).
    pub n_dims: usize,
    /// Number of forward neighbor directions per site.
    pub n_neighbors: usize,
    /// Precomputed neighbor table, length `n_spins * n_neighbors * 2`.
    /// Layout: `table[(i * n_neighbors + d) * 2 + dir]` where `dir = 0`
    /// is forward and `dir = 1` is backward.
    table: Vec<u32>,
    couplings: Vec<f64>,
    /// `2 * n_neighbors` entries per site: forward then backward, per direction.
    adjacency: Vec<Neighbor>,
    bonds: Vec<Bond>,
}

impl Lattice {
    /// Create a hypercubic lattice with unit couplings (e.g. `vec![16, 16]`).
    pub fn new(shape: Vec<usize>) -> Result<Self> {
        let n_dims = shape.len();
        Self::with_offsets(shape, hypercubic(n_dims))
    }

    /// Create a lattice with arbitrary forward neighbor offsets.
    ///
    /// Each offset is a displacement in lattice coordinates; the backward
    /// neighbor is its negation. Periodic boundary conditions are applied via
    /// `rem_euclid`. Fails if the shape is empty, an extent is below 2, or an
    /// offset wraps a site onto itself.
    pub fn with_offsets(shape: Vec<usize>, offsets: Vec<Vec<isize>>) -> Result<Self> {
        let n_dims = shape.len();
        if n_dims == 0 {
            return Err(Error::Configuration("lattice shape is empty".into()));
        }
        if let Some(&extent) = shape.iter().find(|&&s| s < 2) {
            return Err(Error::Configuration(format!(
                "lattice extent {extent} in shape {shape:?}, every extent must be >= 2"
            )));
        }
        if offsets.is_empty() {
            return Err(Error::Configuration("lattice has no neighbor offsets".into()));
        }
        for (idx, off) in offsets.iter().enumerate() {
            if off.len() != n_dims {
                return Err(Error::Configuration(format!(
                    "offset {idx} has length {}, expected {n_dims}",
                    off.len()
                )));
            }
        }

        let n_neighbors = offsets.len();
        let n_spins: usize = shape.iter().product();
        if n_spins > u32::MAX as usize {
            return Err(Error::Configuration(format!(
                "lattice with {n_spins} sites exceeds the u32 index range"
            )));
        }

        let mut strides = vec![1usize; n_dims];
        for d in (0..n_dims - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        let mut table = vec![0u32; n_spins * n_neighbors * 2];

        for i in 0..n_spins {
            let coords: Vec<usize> = (0..n_dims).map(|d| (i / strides[d]) % shape[d]).collect();

            for (d, off) in offsets.iter().enumerate() {
                for (dir, sign) in [(0, 1isize), (1, -1isize)] {
                    let mut flat = 0usize;
                    for dim in 0..n_dims {
                        let c = (coords[dim] as isize + sign * off[dim])
                            .rem_euclid(shape[dim] as isize) as usize;
                        flat += c * strides[dim];
                    }
                    if flat == i {
                        return Err(Error::Configuration(format!(
                            "offset {off:?} wraps site {i} onto itself in shape {shape:?}"
                        )));
                    }
                    table[(i * n_neighbors + d) * 2 + dir] = flat as u32;
                }
            }
        }

        let mut lattice = Self {
            shape,
            strides,
            n_spins,
            n_dims,
            n_neighbors,
            table,
            couplings: vec![1.0; n_spins * n_neighbors],
            adjacency: Vec::new(),
            bonds: Vec::new(),
        };
        lattice.rebuild_adjacency();
        Ok(lattice)
    }

    /// Replace the unit bond weights with per-bond couplings in the forward
    /// layout `couplings[i * n_neighbors + d]`.
    pub fn with_couplings(mut self, couplings: Vec<f64>) -> Result<Self> {
        let expected = self.n_spins * self.n_neighbors;
        if couplings.len() != expected {
            return Err(Error::Configuration(format!(
                "expected {expected} couplings, got {}",
                couplings.len()
            )));
        }
        if let Some(pos) = couplings.iter().position(|c| !c.is_finite()) {
            return Err(Error::Topology(format!(
                "coupling {pos} is not finite ({})",
                couplings[pos]
            )));
        }
        self.couplings = couplings;
        self.rebuild_adjacency();
        Ok(self)
    }

    fn rebuild_adjacency(&mut self) {
        let k = self.n_neighbors;
        let mut adjacency = Vec::with_capacity(self.n_spins * k * 2);
        let mut bonds = Vec::with_capacity(self.n_spins * k);
        for i in 0..self.n_spins {
            for d in 0..k {
                let j_fwd = self.neighbor(i, d, true);
                let j_bwd = self.neighbor(i, d, false);
                adjacency.push(Neighbor {
                    vertex: j_fwd as u32,
                    weight: self.couplings[i * k + d],
                    direction: Direction::Undirected,
                });
                adjacency.push(Neighbor {
                    vertex: j_bwd as u32,
                    weight: self.couplings[j_bwd * k + d],
                    direction: Direction::Undirected,
                });
                bonds.push(Bond {
                    source: i as u32,
                    target: j_fwd as u32,
                    weight: self.couplings[i * k + d],
                    oriented: false,
                });
            }
        }
        self.adjacency = adjacency;
        self.bonds = bonds;
    }

    /// Return the neighbor of site `flat_idx` in direction `dim`.
    /// `forward = true` means +offset, `forward = false` means −offset.
    #[inline]
    pub fn neighbor(&self, flat_idx: usize, dim: usize, forward: bool) -> usize {
        self.table[(flat_idx * self.n_neighbors + dim) * 2 + (!forward as usize)] as usize
    }

    /// Row-major linear index of a coordinate tuple. Coordinates are wrapped
    /// with `rem_euclid`, so `[-1, 0]` addresses the last row.
    pub fn linear_index(&self, coords: &[isize]) -> Result<usize> {
        if coords.len() != self.n_dims {
            return Err(Error::Configuration(format!(
                "expected {} coordinates, got {}",
                self.n_dims,
                coords.len()
            )));
        }
        Ok(coords
            .iter()
            .zip(self.shape.iter().zip(self.strides.iter()))
            .map(|(&c, (&extent, &stride))| c.rem_euclid(extent as isize) as usize * stride)
            .sum())
    }

    /// Inverse of [`Lattice::linear_index`] for in-range indices.
    pub fn coords(&self, flat_idx: usize) -> Vec<usize> {
        (0..self.n_dims)
            .map(|d| (flat_idx / self.strides[d]) % self.shape[d])
            .collect()
    }

    #[inline]
    pub fn neighbors(&self, flat_idx: usize) -> &[Neighbor] {
        let w = 2 * self.n_neighbors;
        &self.adjacency[flat_idx * w..(flat_idx + 1) * w]
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn couplings(&self) -> &[f64] {
        &self.couplings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2d_neighbors() {
        // 3x4 lattice
        let lat = Lattice::new(vec![3, 4]).unwrap();
        assert_eq!(lat.n_spins, 12);
        assert_eq!(lat.strides, vec![4, 1]);

        // Spin 0 = (0,0): forward in dim 0 -> (1,0)=4, forward in dim 1 -> (0,1)=1
        assert_eq!(lat.neighbor(0, 0, true), 4);
        assert_eq!(lat.neighbor(0, 1, true), 1);

        // backward wraps: dim 0 -> (2,0)=8, dim 1 -> (0,3)=3
        assert_eq!(lat.neighbor(0, 0, false), 8);
        assert_eq!(lat.neighbor(0, 1, false), 3);

        // Spin 11 = (2,3): both forward neighbors wrap
        assert_eq!(lat.neighbor(11, 0, true), 3);
        assert_eq!(lat.neighbor(11, 1, true), 8);
    }

    #[test]
    fn test_3d_neighbors() {
        let lat = Lattice::new(vec![2, 3, 4]).unwrap();
        assert_eq!(lat.n_spins, 24);
        assert_eq!(lat.strides, vec![12, 4, 1]);

        assert_eq!(lat.neighbor(0, 0, true), 12); // (1,0,0)
        assert_eq!(lat.neighbor(0, 1, true), 4); // (0,1,0)
        assert_eq!(lat.neighbor(0, 2, true), 1); // (0,0,1)
        assert_eq!(lat.neighbors(0).len(), 6);
    }

    #[test]
    fn test_triangular_neighbors() {
        use super::super::offsets::triangular;

        let lat = Lattice::with_offsets(vec![4, 4], triangular()).unwrap();
        assert_eq!(lat.n_neighbors, 3);

        // offset [1,-1] from (0,0) -> (1,3) = 7, backward -> (3,1) = 13
        assert_eq!(lat.neighbor(0, 2, true), 7);
        assert_eq!(lat.neighbor(0, 2, false), 13);
        // Site 15 = (3,3): offset [0,1] -> (3,0) = 12
        assert_eq!(lat.neighbor(15, 1, true), 12);
    }

    #[test]
    fn test_linear_index_wraps() {
        let lat = Lattice::new(vec![3, 4]).unwrap();
        assert_eq!(lat.linear_index(&[1, 2]).unwrap(), 6);
        assert_eq!(lat.linear_index(&[-1, 0]).unwrap(), 8);
        assert_eq!(lat.linear_index(&[3, 5]).unwrap(), 1);
        assert_eq!(lat.coords(6), vec![1, 2]);
        assert!(lat.linear_index(&[0]).is_err());
    }

    #[test]
    fn test_backward_entry_uses_neighbor_coupling() {
        let lat = Lattice::new(vec![2, 3]).unwrap();
        let couplings: Vec<f64> = (0..lat.n_spins * lat.n_neighbors).map(|k| k as f64).collect();
        let lat = lat.with_couplings(couplings.clone()).unwrap();
        assert_eq!(lat.couplings(), couplings.as_slice());

        // site 4 = (1,1); backward in dim 1 is site 3, whose forward bond in dim 1 is entry 3*2+1
        let nb = lat.neighbors(4)[3];
        assert_eq!(nb.vertex, 3);
        assert_eq!(nb.weight, 7.0);
        assert_eq!(lat.bonds().len(), 12);
    }

    #[test]
    fn test_rejects_degenerate_shapes() {
        assert!(matches!(Lattice::new(vec![]), Err(Error::Configuration(_))));
        assert!(matches!(Lattice::new(vec![4, 0]), Err(Error::Configuration(_))));
        assert!(matches!(Lattice::new(vec![4, 1]), Err(Error::Configuration(_))));
        assert!(matches!(
            Lattice::with_offsets(vec![4, 4], vec![vec![4, 0]]),
            Err(Error::Configuration(_))
        ));
        let lat = Lattice::new(vec![2, 2]).unwrap();
        assert!(matches!(
            lat.with_couplings(vec![1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            Err(Error::Topology(_))
        ));
    }
}
