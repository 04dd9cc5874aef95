use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

use super::SpinConfig;
use crate::config::ModelParams;
use crate::error::{Error, Result};
use crate::geometry::Topology;

/// Energy model of one run: validated parameters plus the fixed per-site
/// preferences used by the self-identity term.
///
/// ```text
/// local_field(v, l) = (1 - ε) Σ_{u ∈ in(v)} J_l w(v,u) s_l(u) + ε p_l(v) + H + κ Σ_{m ≠ l} s_m(v)
/// E = -(1 - ε) Σ_l Σ_bonds J_l w s_l(i) s_l(j) - Σ_l Σ_v s_l(v) (ε p_l(v) + H) - κ Σ_v Σ_{l<m} s_l(v) s_m(v)
/// ```
///
/// `in(v)` are the undirected and incoming neighbors of `v`. Every bond is
/// counted once in `E`, which is the local-field sum with the one-half
/// correction applied to non-oriented pairs only.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    params: ModelParams,
    preferences: SpinConfig,
}

impl Hamiltonian {
    /// Validate `params` against `topology`; every preference starts at +1.
    pub fn new(params: ModelParams, topology: &Topology) -> Result<Self> {
        params.validate()?;
        let preferences = SpinConfig::uniform(params.n_layers, topology.n_vertices(), 1)?;
        Ok(Self {
            params,
            preferences,
        })
    }

    /// Use explicit preferences, one ±1 value per (layer, vertex).
    pub fn with_preferences(mut self, preferences: SpinConfig) -> Result<Self> {
        if preferences.n_layers() != self.preferences.n_layers()
            || preferences.n_vertices() != self.preferences.n_vertices()
        {
            return Err(Error::Configuration(format!(
                "preferences are {}x{}, model needs {}x{}",
                preferences.n_layers(),
                preferences.n_vertices(),
                self.preferences.n_layers(),
                self.preferences.n_vertices()
            )));
        }
        self.preferences = preferences;
        Ok(self)
    }

    /// I.i.d. uniform ±1 preferences.
    pub fn with_random_preferences(mut self, seed: u64) -> Self {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        self.preferences.randomize_from(&mut rng);
        self
    }

    /// Same preferences, different parameters (e.g. the next point of a scan).
    pub fn with_params(&self, params: ModelParams) -> Result<Self> {
        params.validate()?;
        if params.n_layers != self.n_layers() {
            return Err(Error::Configuration(format!(
                "cannot move preferences from {} to {} layers",
                self.n_layers(),
                params.n_layers
            )));
        }
        Ok(Self {
            params,
            preferences: self.preferences.clone(),
        })
    }

    #[inline]
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.params.temperature
    }

    #[inline]
    pub fn n_layers(&self) -> usize {
        self.params.n_layers
    }

    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.preferences.n_vertices()
    }

    #[inline]
    pub fn preference(&self, layer: usize, vertex: usize) -> i8 {
        self.preferences.get(layer, vertex)
    }

    pub fn preferences(&self) -> &SpinConfig {
        &self.preferences
    }

    /// Fail unless `spins` has this model's layer and vertex counts.
    pub fn check_dims(&self, topology: &Topology, spins: &SpinConfig) -> Result<()> {
        if topology.n_vertices() != self.n_vertices() {
            return Err(Error::Configuration(format!(
                "model built for {} vertices, topology has {}",
                self.n_vertices(),
                topology.n_vertices()
            )));
        }
        if spins.n_layers() != self.n_layers() || spins.n_vertices() != self.n_vertices() {
            return Err(Error::Configuration(format!(
                "spin configuration is {}x{}, model needs {}x{}",
                spins.n_layers(),
                spins.n_vertices(),
                self.n_layers(),
                self.n_vertices()
            )));
        }
        Ok(())
    }

    /// Σ w s over the neighbors of `vertex` in one layer, self-loops excluded.
    /// With `all_edges`, outgoing oriented edges are included too.
    #[inline]
    fn neighbor_sum(
        layer_spins: &[i8],
        topology: &Topology,
        vertex: usize,
        all_edges: bool,
    ) -> f64 {
        let mut h = 0.0;
        for nb in topology.neighbors(vertex) {
            if all_edges || nb.direction.feeds_field() {
                h += nb.weight * layer_spins[nb.vertex as usize] as f64;
            }
        }
        h
    }

    /// Site-local part of the field: self-identity, external field, inter-layer.
    #[inline]
    fn bias(&self, spins: &SpinConfig, layer: usize, vertex: usize) -> f64 {
        let p = &self.params;
        let mut b = p.self_identity * self.preference(layer, vertex) as f64 + p.field;
        if p.interlayer != 0.0 {
            let others: i64 = (0..spins.n_layers())
                .filter(|&m| m != layer)
                .map(|m| spins.get(m, vertex) as i64)
                .sum();
            b += p.interlayer * others as f64;
        }
        b
    }

    #[inline]
    fn pair_scale(&self, layer: usize) -> f64 {
        (1.0 - self.params.self_identity) * self.params.coupling_for(layer)
    }

    /// Effective field acting on (`layer`, `vertex`).
    #[inline]
    pub fn local_field(
        &self,
        topology: &Topology,
        spins: &SpinConfig,
        layer: usize,
        vertex: usize,
    ) -> f64 {
        let nb = Self::neighbor_sum(spins.layer(layer), topology, vertex, false);
        self.pair_scale(layer) * nb + self.bias(spins, layer, vertex)
    }

    /// `ΔE = 2 s h`: the energy cost a flip of (`layer`, `vertex`) is judged by.
    #[inline]
    pub fn flip_cost(
        &self,
        topology: &Topology,
        spins: &SpinConfig,
        layer: usize,
        vertex: usize,
    ) -> f64 {
        2.0 * spins.get(layer, vertex) as f64 * self.local_field(topology, spins, layer, vertex)
    }

    /// Exact change of [`Hamiltonian::total_energy`] if (`layer`, `vertex`)
    /// flips. Equals [`Hamiltonian::flip_cost`] unless the vertex has outgoing
    /// oriented edges, whose terms the flip changes without feeling them.
    #[inline]
    pub fn energy_change(
        &self,
        topology: &Topology,
        spins: &SpinConfig,
        layer: usize,
        vertex: usize,
    ) -> f64 {
        let nb = Self::neighbor_sum(spins.layer(layer), topology, vertex, true);
        let h = self.pair_scale(layer) * nb + self.bias(spins, layer, vertex);
        2.0 * spins.get(layer, vertex) as f64 * h
    }

    /// Total energy by full recomputation.
    pub fn total_energy(&self, topology: &Topology, spins: &SpinConfig) -> f64 {
        let p = &self.params;
        let n_vertices = spins.n_vertices();
        let mut energy = 0.0;

        for layer in 0..spins.n_layers() {
            let s = spins.layer(layer);
            let mut pair = 0.0;
            for b in topology.bonds() {
                pair += b.weight * (s[b.source as usize] * s[b.target as usize]) as f64;
            }
            energy -= self.pair_scale(layer) * pair;

            let mut single = 0.0;
            for (v, &sv) in s.iter().enumerate() {
                let pref = self.preference(layer, v) as f64;
                single += sv as f64 * (p.self_identity * pref + p.field);
            }
            energy -= single;
        }

        if p.interlayer != 0.0 {
            let mut inter = 0i64;
            for v in 0..n_vertices {
                for l in 0..spins.n_layers() {
                    for m in l + 1..spins.n_layers() {
                        inter += (spins.get(l, v) * spins.get(m, v)) as i64;
                    }
                }
            }
            energy -= p.interlayer * inter as f64;
        }

        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Edge, Graph, GraphOptions, Lattice};
    use approx::assert_relative_eq;

    fn lattice_4x4() -> Topology {
        Lattice::new(vec![4, 4]).unwrap().into()
    }

    #[test]
    fn test_ground_state_energy() {
        let topo = lattice_4x4();
        let h = Hamiltonian::new(ModelParams::ising(1.0), &topo).unwrap();
        let up = SpinConfig::uniform(1, 16, 1).unwrap();
        // 2 bonds per site
        assert_relative_eq!(h.total_energy(&topo, &up), -32.0);

        let mut checker = up.clone();
        for v in 0..16 {
            let c = Lattice::new(vec![4, 4]).unwrap().coords(v);
            if (c[0] + c[1]) % 2 == 1 {
                checker.flip(0, v);
            }
        }
        assert_relative_eq!(h.total_energy(&topo, &checker), 32.0);
    }

    #[test]
    fn test_local_field_terms() {
        let topo = lattice_4x4();
        let params = ModelParams::ising(1.0)
            .with_coupling(2.0)
            .with_field(0.5)
            .with_self_identity(0.25)
            .with_layers(2, 0.3);
        let h = Hamiltonian::new(params, &topo).unwrap();
        let mut spins = SpinConfig::uniform(2, 16, 1).unwrap();
        spins.set(1, 5, -1).unwrap();

        // layer 0, vertex 5: 4 up neighbors, pref +1, other layer -1
        let expected = 0.75 * 2.0 * 4.0 + 0.25 + 0.5 - 0.3;
        assert_relative_eq!(h.local_field(&topo, &spins, 0, 5), expected);
        assert_relative_eq!(h.flip_cost(&topo, &spins, 0, 5), 2.0 * expected);
    }

    #[test]
    fn test_pure_self_identity_ignores_neighbors() {
        let topo = lattice_4x4();
        let h = Hamiltonian::new(ModelParams::ising(1.0).with_self_identity(1.0), &topo)
            .unwrap()
            .with_random_preferences(9);
        let a = SpinConfig::random(1, 16, 1).unwrap();
        let b = SpinConfig::random(1, 16, 2).unwrap();
        for v in 0..16 {
            let expected = h.preference(0, v) as f64;
            assert_relative_eq!(h.local_field(&topo, &a, 0, v), expected);
            assert_relative_eq!(h.local_field(&topo, &b, 0, v), expected);
        }
    }

    #[test]
    fn test_total_energy_matches_half_corrected_field_sum() {
        let topo = lattice_4x4();
        let params = ModelParams::ising(1.0)
            .with_field(-0.4)
            .with_self_identity(0.3)
            .with_layers(2, 0.7);
        let h = Hamiltonian::new(params.clone(), &topo)
            .unwrap()
            .with_random_preferences(4);
        let spins = SpinConfig::random(2, 16, 11).unwrap();

        let mut expected = 0.0;
        for l in 0..2 {
            for v in 0..16 {
                let s = spins.get(l, v) as f64;
                let nb: f64 = topo
                    .neighbors(v)
                    .iter()
                    .map(|n| n.weight * spins.get(l, n.vertex as usize) as f64)
                    .sum();
                let other = spins.get(1 - l, v) as f64;
                let field = 0.5 * (1.0 - params.self_identity) * nb
                    + params.self_identity * h.preference(l, v) as f64
                    + params.field
                    + 0.5 * params.interlayer * other;
                expected -= s * field;
            }
        }
        assert_relative_eq!(h.total_energy(&topo, &spins), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_energy_change_matches_recomputation() {
        // mixed graph: oriented edges make flip_cost and energy_change differ
        let topo: Topology = Graph::new(
            4,
            vec![
                Edge::undirected(0, 1, 1.0),
                Edge::oriented(1, 2, 0.7),
                Edge::oriented(2, 3, -0.4),
                Edge::oriented(3, 1, 1.3),
            ],
            GraphOptions::default(),
        )
        .unwrap()
        .into();
        let h = Hamiltonian::new(ModelParams::ising(1.0).with_field(0.2), &topo).unwrap();
        let mut spins = SpinConfig::random(1, 4, 5).unwrap();

        for v in [1, 2, 3, 0, 2] {
            let before = h.total_energy(&topo, &spins);
            let de = h.energy_change(&topo, &spins, 0, v);
            spins.flip(0, v);
            assert_relative_eq!(h.total_energy(&topo, &spins) - before, de, epsilon = 1e-12);
        }

        // vertex 1 has an outgoing edge to 2: the cost it feels excludes it
        let all_up = SpinConfig::uniform(1, 4, 1).unwrap();
        assert_relative_eq!(h.local_field(&topo, &all_up, 0, 1), 1.0 + 1.3 + 0.2);
        assert_relative_eq!(h.energy_change(&topo, &all_up, 0, 1), 2.0 * (1.0 + 1.3 + 0.7 + 0.2));
    }

    #[test]
    fn test_dimension_checks() {
        let topo = lattice_4x4();
        let h = Hamiltonian::new(ModelParams::ising(1.0).with_layers(2, 0.1), &topo).unwrap();
        assert!(h.check_dims(&topo, &SpinConfig::uniform(2, 16, 1).unwrap()).is_ok());
        assert!(h.check_dims(&topo, &SpinConfig::uniform(1, 16, 1).unwrap()).is_err());
        assert!(h
            .clone()
            .with_preferences(SpinConfig::uniform(2, 15, 1).unwrap())
            .is_err());
        assert!(Hamiltonian::new(ModelParams::ising(0.0), &topo).is_err());
    }
}
