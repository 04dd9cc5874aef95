use super::utils::bfs_cluster;
use crate::geometry::{Direction, Topology};
use crate::spins::{Hamiltonian, SpinConfig};
use rand::Rng;

/// A flipped Wolff cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub layer: usize,
    /// Spin value every member had before the flip.
    pub seed_spin: i8,
    /// Member vertices in join order, seed first.
    pub vertices: Vec<u32>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Single Wolff cluster move.
///
/// The seed is drawn uniformly from `free_sites` (flat (layer, vertex)
/// indices of non-pinned spins). The cluster grows inside the seed's layer
/// along undirected bonds to same-signed, non-pinned neighbors, each bond
/// activating with `p = 1 - exp(-2 J w / T)`; bonds with `J w <= 0` never
/// activate. Oriented edges and the inter-layer coupling take no part, and
/// neither do the field and self-identity terms, so with any of those present
/// the move is only an approximate sampler.
///
/// Returns `None` when every spin is pinned.
#[cfg_attr(feature = "profile", inline(never))]
pub fn wolff_update<R: Rng + ?Sized>(
    topology: &Topology,
    hamiltonian: &Hamiltonian,
    spins: &mut SpinConfig,
    free_sites: &[u32],
    rng: &mut R,
) -> Option<Cluster> {
    if free_sites.is_empty() {
        return None;
    }
    let n_vertices = spins.n_vertices();
    let seed_site = free_sites[rng.gen_range(0..free_sites.len())] as usize;
    let (layer, seed) = (seed_site / n_vertices, seed_site % n_vertices);
    let base = layer * n_vertices;

    let seed_spin = spins.spin_at(seed_site);
    let temp = hamiltonian.temperature();
    let coupling = hamiltonian.params().coupling_for(layer);

    let mut in_cluster = vec![false; n_vertices];
    let mut stack = Vec::with_capacity(n_vertices);
    let mut vertices = Vec::new();
    {
        let layer_spins = spins.layer(layer);
        let spins = &*spins;
        bfs_cluster(
            topology,
            seed,
            &mut in_cluster,
            &mut stack,
            &mut vertices,
            |_, nb| {
                if nb.direction != Direction::Undirected {
                    return false;
                }
                let j = nb.vertex as usize;
                if layer_spins[j] != seed_spin || spins.is_pinned_site(base + j) {
                    return false;
                }
                let bond = coupling * nb.weight;
                if bond <= 0.0 {
                    return false;
                }
                rng.gen::<f64>() < 1.0 - (-2.0 * bond / temp).exp()
            },
        );
    }

    for &v in &vertices {
        spins.flip_site(base + v as usize);
    }

    Some(Cluster {
        layer,
        seed_spin,
        vertices,
    })
}
