use crate::config::SiteSelection;
use crate::geometry::Topology;
use crate::spins::{Hamiltonian, SpinConfig};
use rand::Rng;

/// Largest `ΔE / T` fed to `exp`; beyond it the acceptance is below 1e-304.
const MAX_EXPONENT: f64 = 700.0;

/// Metropolis acceptance rule.
///
/// Downhill and neutral moves are always accepted without consuming a random
/// number. Uphill moves are accepted with probability `exp(-ΔE / T)` against a
/// fresh uniform draw; the exponent is clamped so vanishing temperatures
/// reject instead of producing NaN, and `T <= 0` rejects every uphill move.
#[inline]
pub fn metropolis_accept<R: Rng + ?Sized>(delta_e: f64, temp: f64, rng: &mut R) -> bool {
    if delta_e <= 0.0 {
        return true;
    }
    if temp <= 0.0 {
        return false;
    }
    let x = (delta_e / temp).min(MAX_EXPONENT);
    rng.gen::<f64>() < (-x).exp()
}

/// Counters of one or more Metropolis attempts, with the bookkeeping the
/// caller needs to keep its cached energy and magnetization current.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepStats {
    pub attempts: usize,
    pub accepted: usize,
    /// Exact change of the total energy.
    pub delta_energy: f64,
    /// Change of `Σ_v s(l, v)` per layer.
    pub delta_sums: Vec<i64>,
}

impl SweepStats {
    pub fn new(n_layers: usize) -> Self {
        Self {
            delta_sums: vec![0; n_layers],
            ..Default::default()
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempts as f64
    }
}

/// One elementary attempt on flat site index `site`.
///
/// Returns the exact energy change when the flip is accepted. Pinned sites are
/// never flipped.
#[inline]
pub fn metropolis_step<R: Rng + ?Sized>(
    topology: &Topology,
    hamiltonian: &Hamiltonian,
    spins: &mut SpinConfig,
    site: usize,
    rng: &mut R,
) -> Option<f64> {
    if spins.is_pinned_site(site) {
        return None;
    }
    let n_vertices = spins.n_vertices();
    let (layer, vertex) = (site / n_vertices, site % n_vertices);

    let cost = hamiltonian.flip_cost(topology, spins, layer, vertex);
    if !metropolis_accept(cost, hamiltonian.temperature(), rng) {
        return None;
    }
    let de = if topology.has_oriented_edges() {
        hamiltonian.energy_change(topology, spins, layer, vertex)
    } else {
        cost
    };
    spins.flip_site(site);
    Some(de)
}

/// One Monte Carlo step: `n_layers * n_vertices` elementary attempts.
///
/// `Sequential` visits every (layer, vertex) exactly once in index order;
/// `Random` picks each attempt's site uniformly.
#[cfg_attr(feature = "profile", inline(never))]
pub fn metropolis_sweep<R: Rng + ?Sized>(
    topology: &Topology,
    hamiltonian: &Hamiltonian,
    spins: &mut SpinConfig,
    selection: SiteSelection,
    rng: &mut R,
) -> SweepStats {
    let n_sites = spins.n_sites();
    let n_vertices = spins.n_vertices();
    let mut stats = SweepStats::new(spins.n_layers());

    for k in 0..n_sites {
        let site = match selection {
            SiteSelection::Sequential => k,
            SiteSelection::Random => rng.gen_range(0..n_sites),
        };
        stats.attempts += 1;
        if let Some(de) = metropolis_step(topology, hamiltonian, spins, site, rng) {
            stats.accepted += 1;
            stats.delta_energy += de;
            // spin now holds the new value; the sum moved by twice that
            stats.delta_sums[site / n_vertices] += 2 * spins.spin_at(site) as i64;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelParams;
    use crate::geometry::Lattice;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_downhill_always_accepted() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for de in [-8.0, -0.1, 0.0] {
            for temp in [1e-12, 0.5, 100.0] {
                assert!(metropolis_accept(de, temp, &mut rng));
            }
        }
    }

    #[test]
    fn test_uphill_rate_matches_boltzmann() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let n = 200_000;
        for (de, temp) in [(1.0, 1.0), (4.0, 2.27), (0.5, 0.25)] {
            let hits = (0..n).filter(|_| metropolis_accept(de, temp, &mut rng)).count();
            let p = f64::exp(-de / temp);
            let sigma = (p * (1.0 - p) / n as f64).sqrt();
            assert!(
                (hits as f64 / n as f64 - p).abs() < 5.0 * sigma,
                "dE={de} T={temp}: rate {} vs {p}",
                hits as f64 / n as f64
            );
        }
    }

    #[test]
    fn test_zero_temperature_limit_rejects_uphill() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        assert!(!metropolis_accept(1e-9, 1e-300, &mut rng));
        assert!(!metropolis_accept(4.0, 0.0, &mut rng));
        assert!(!metropolis_accept(4.0, -1.0, &mut rng));
    }

    #[test]
    fn test_sweep_bookkeeping() {
        let topo: Topology = Lattice::new(vec![6, 6]).unwrap().into();
        let h = Hamiltonian::new(ModelParams::ising(2.5).with_field(0.1), &topo).unwrap();
        let mut spins = SpinConfig::random(1, 36, 4).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);

        for selection in [SiteSelection::Sequential, SiteSelection::Random] {
            for _ in 0..20 {
                let e0 = h.total_energy(&topo, &spins);
                let m0 = spins.layer_sum(0);
                let stats = metropolis_sweep(&topo, &h, &mut spins, selection, &mut rng);
                assert_eq!(stats.attempts, 36);
                assert!(stats.accepted <= stats.attempts);
                assert_relative_eq!(
                    e0 + stats.delta_energy,
                    h.total_energy(&topo, &spins),
                    epsilon = 1e-9
                );
                assert_eq!(m0 + stats.delta_sums[0], spins.layer_sum(0));
                assert!(spins.as_slice().iter().all(|&s| s == 1 || s == -1));
            }
        }
    }

    #[test]
    fn test_pinned_site_never_flips() {
        let topo: Topology = Lattice::new(vec![4, 4]).unwrap().into();
        let h = Hamiltonian::new(ModelParams::ising(50.0), &topo).unwrap();
        let mut spins = SpinConfig::uniform(1, 16, -1).unwrap();
        spins.pin(0, 6, 1).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(6);
        for _ in 0..200 {
            metropolis_sweep(&topo, &h, &mut spins, SiteSelection::Random, &mut rng);
            assert_eq!(spins.get(0, 6), 1);
        }
    }
}
