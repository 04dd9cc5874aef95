pub mod scan;
mod threshold;

pub use scan::{first_passage_times, run_carried, run_independent};

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

use crate::clusters::{wolff_update, Cluster};
use crate::config::{RunConfig, SiteSelection, Updater};
use crate::error::{Error, Result};
use crate::geometry::Topology;
use crate::mcmc::{self, SweepStats};
use crate::spins::{Hamiltonian, SpinConfig};
use crate::statistics::{ObservableAccumulator, RunResult};

/// Starting spins of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialState {
    /// I.i.d. uniform ±1, drawn from the run's own stream.
    Random,
    /// Every spin set to the given ±1 value.
    Uniform(i8),
    Given(SpinConfig),
}

/// Mutable state of one Markov chain.
///
/// Owns the spins and the random stream, and keeps the total energy and the
/// per-layer spin sums current across updates. The topology and Hamiltonian
/// are borrowed read-only, so many simulations can share them.
pub struct Simulation<'a> {
    topology: &'a Topology,
    hamiltonian: &'a Hamiltonian,
    spins: SpinConfig,
    rng: Xoshiro256StarStar,
    energy: f64,
    layer_sums: Vec<i64>,
    free_sites: Vec<u32>,
    sweeps_done: usize,
}

impl<'a> Simulation<'a> {
    pub fn new(
        topology: &'a Topology,
        hamiltonian: &'a Hamiltonian,
        initial: InitialState,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let (n_layers, n_vertices) = (hamiltonian.n_layers(), topology.n_vertices());
        let spins = match initial {
            InitialState::Random => {
                let mut spins = SpinConfig::uniform(n_layers, n_vertices, 1)?;
                spins.randomize_from(&mut rng);
                spins
            }
            InitialState::Uniform(value) => SpinConfig::uniform(n_layers, n_vertices, value)?,
            InitialState::Given(spins) => spins,
        };
        hamiltonian.check_dims(topology, &spins)?;

        let energy = hamiltonian.total_energy(topology, &spins);
        let layer_sums = (0..n_layers).map(|l| spins.layer_sum(l)).collect();
        let free_sites = spins.free_sites();
        Ok(Self {
            topology,
            hamiltonian,
            spins,
            rng,
            energy,
            layer_sums,
            free_sites,
            sweeps_done: 0,
        })
    }

    /// Keep the spins and random stream, switch to another parameter point.
    pub fn continue_with<'b>(self, hamiltonian: &'b Hamiltonian) -> Result<Simulation<'b>>
    where
        'a: 'b,
    {
        hamiltonian.check_dims(self.topology, &self.spins)?;
        let energy = hamiltonian.total_energy(self.topology, &self.spins);
        Ok(Simulation {
            topology: self.topology,
            hamiltonian,
            spins: self.spins,
            rng: self.rng,
            energy,
            layer_sums: self.layer_sums,
            free_sites: self.free_sites,
            sweeps_done: self.sweeps_done,
        })
    }

    pub fn topology(&self) -> &'a Topology {
        self.topology
    }

    pub fn hamiltonian(&self) -> &'a Hamiltonian {
        self.hamiltonian
    }

    pub fn spins(&self) -> &SpinConfig {
        &self.spins
    }

    pub fn into_spins(self) -> SpinConfig {
        self.spins
    }

    pub fn sweeps_done(&self) -> usize {
        self.sweeps_done
    }

    /// Cached total energy.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Recompute the total energy from scratch and resync the cache.
    pub fn recompute_energy(&mut self) -> f64 {
        self.energy = self.hamiltonian.total_energy(self.topology, &self.spins);
        self.energy
    }

    pub fn magnetization(&self, layer: usize) -> f64 {
        self.layer_sums[layer] as f64 / self.spins.n_vertices() as f64
    }

    pub fn magnetizations(&self) -> Vec<f64> {
        (0..self.layer_sums.len())
            .map(|l| self.magnetization(l))
            .collect()
    }

    /// Pin a site for the rest of the chain.
    pub fn pin(&mut self, layer: usize, vertex: usize, value: i8) -> Result<()> {
        self.spins.pin(layer, vertex, value)?;
        let sum: i64 = self.spins.layer(layer).iter().map(|&s| s as i64).sum();
        if sum != self.layer_sums[layer] {
            self.layer_sums[layer] = sum;
            self.recompute_energy();
        }
        self.free_sites = self.spins.free_sites();
        Ok(())
    }

    fn apply(&mut self, stats: &SweepStats) {
        self.energy += stats.delta_energy;
        for (sum, &d) in self.layer_sums.iter_mut().zip(&stats.delta_sums) {
            *sum += d;
        }
    }

    /// One Metropolis sweep.
    pub fn metropolis_sweep(&mut self, selection: SiteSelection) -> SweepStats {
        let stats = mcmc::metropolis_sweep(
            self.topology,
            self.hamiltonian,
            &mut self.spins,
            selection,
            &mut self.rng,
        );
        self.apply(&stats);
        self.sweeps_done += 1;
        stats
    }

    /// One elementary Metropolis attempt on a uniformly random site.
    pub(crate) fn metropolis_attempt(&mut self) -> bool {
        let n_sites = self.spins.n_sites();
        let site = self.rng.gen_range(0..n_sites);
        let step = mcmc::metropolis_step(
            self.topology,
            self.hamiltonian,
            &mut self.spins,
            site,
            &mut self.rng,
        );
        match step {
            Some(de) => {
                self.energy += de;
                let n_vertices = self.spins.n_vertices();
                let (layer, vertex) = (site / n_vertices, site % n_vertices);
                self.layer_sums[layer] += 2 * self.spins.get(layer, vertex) as i64;
                true
            }
            None => false,
        }
    }

    /// One Wolff cluster move; counts as one sweep.
    pub fn wolff_step(&mut self) -> Option<Cluster> {
        self.sweeps_done += 1;
        let cluster = wolff_update(
            self.topology,
            self.hamiltonian,
            &mut self.spins,
            &self.free_sites,
            &mut self.rng,
        )?;

        // Replay the flips one at a time for an exact energy change.
        let layer = cluster.layer;
        for &v in &cluster.vertices {
            self.spins.flip(layer, v as usize);
        }
        let mut delta = 0.0;
        for &v in &cluster.vertices {
            delta += self
                .hamiltonian
                .energy_change(self.topology, &self.spins, layer, v as usize);
            self.spins.flip(layer, v as usize);
        }
        self.energy += delta;
        self.layer_sums[layer] -= 2 * cluster.seed_spin as i64 * cluster.len() as i64;
        Some(cluster)
    }

    /// Record the current state as one sample.
    pub fn record(&self, observables: &mut ObservableAccumulator) -> Result<()> {
        observables.record(self.sweeps_done, self.energy, self.magnetizations())
    }

    /// [`run_sweep_loop`] without cancellation or progress reporting.
    pub fn run(&mut self, config: &RunConfig) -> Result<RunResult> {
        run_sweep_loop(self, config, &AtomicBool::new(false), &|| {})
    }
}

/// Run equilibration then sampling on an existing chain.
///
/// Samples are recorded after every `sampling_interval`-th sampling sweep, so a
/// full run yields `sampling_sweeps / sampling_interval` samples. One Wolff
/// sweep is a single cluster move. The chain's own stream is used; `config.seed`
/// only matters to [`simulate`] and the scans.
///
/// `interrupted` is checked before each sweep. A cancelled run still returns
/// `Ok` with the samples recorded so far and `interrupted` set.
///
/// `on_sweep` is called once per sweep (useful for progress bars).
pub fn run_sweep_loop(
    sim: &mut Simulation,
    config: &RunConfig,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<RunResult> {
    config.validate()?;
    let params = sim.hamiltonian.params();
    let warnings = config.warnings(params, sim.topology);
    for w in &warnings {
        warn!("{w}");
    }

    let eq_sweeps = config.equilibration_sweeps;
    let n_sweeps = eq_sweeps + config.sampling_sweeps;
    let interval = config.sampling_interval;
    debug!(
        "run: {:?}, T={}, {} equilibration + {} sampling sweeps",
        config.updater, params.temperature, eq_sweeps, config.sampling_sweeps
    );

    let mut observables =
        ObservableAccumulator::new(params.temperature, params.n_layers, sim.spins.n_vertices());
    let (mut attempts, mut accepted) = (0usize, 0usize);
    let (mut moves, mut flipped) = (0usize, 0usize);
    let mut stopped = false;

    for sweep_id in 0..n_sweeps {
        if interrupted.load(Ordering::Relaxed) {
            debug!("run interrupted after {sweep_id} sweeps");
            stopped = true;
            break;
        }
        on_sweep();
        if sweep_id == eq_sweeps {
            debug!("equilibration done, E={:.6}", sim.energy);
        }

        match config.updater {
            Updater::Metropolis => {
                let stats = sim.metropolis_sweep(config.site_selection);
                attempts += stats.attempts;
                accepted += stats.accepted;
            }
            Updater::Wolff => {
                moves += 1;
                if let Some(cluster) = sim.wolff_step() {
                    flipped += cluster.len();
                }
            }
        }

        if sweep_id >= eq_sweeps && (sweep_id - eq_sweeps + 1) % interval == 0 {
            sim.record(&mut observables)?;
        }
    }

    let acceptance_rate = (config.updater == Updater::Metropolis && attempts > 0)
        .then(|| accepted as f64 / attempts as f64);
    let mean_cluster_size =
        (config.updater == Updater::Wolff && moves > 0).then(|| flipped as f64 / moves as f64);
    let summary = observables.summary(config.autocorrelation_max_lag);
    debug!("run finished: {} samples", observables.len());

    Ok(RunResult {
        observables,
        summary,
        spins: sim.spins.clone(),
        sweeps_done: sim.sweeps_done,
        interrupted: stopped,
        warnings,
        acceptance_rate,
        mean_cluster_size,
    })
}

/// Build a chain seeded with `config.seed` and run it to completion.
pub fn simulate(
    topology: &Topology,
    hamiltonian: &Hamiltonian,
    initial: InitialState,
    config: &RunConfig,
) -> Result<RunResult> {
    let mut sim = Simulation::new(topology, hamiltonian, initial, config.seed)?;
    sim.run(config)
}

pub(crate) fn check_layer(sim: &Simulation, layer: usize) -> Result<()> {
    if layer >= sim.hamiltonian.n_layers() {
        return Err(Error::Configuration(format!(
            "layer {layer} out of range for {} layers",
            sim.hamiltonian.n_layers()
        )));
    }
    Ok(())
}
