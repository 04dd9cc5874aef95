//! Parameter scans built from independent or state-carrying runs.

use std::sync::atomic::AtomicBool;

use log::debug;

use super::{run_sweep_loop, InitialState, Simulation};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::geometry::Topology;
use crate::parallel::par_over_runs;
use crate::spins::Hamiltonian;
use crate::statistics::RunResult;

/// `runs_per_point` independent runs at every parameter point.
///
/// Run `k` (point-major) is seeded `config.seed + k` and starts from its own
/// copy of `initial`. Results come back grouped per point, in input order; pool
/// each group with [`RunResult::pooled_summary`] to average over initial
/// conditions.
#[allow(clippy::too_many_arguments)]
pub fn run_independent(
    topology: &Topology,
    points: &[&Hamiltonian],
    runs_per_point: usize,
    initial: &InitialState,
    config: &RunConfig,
    sequential: bool,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<Vec<Vec<RunResult>>> {
    if points.is_empty() || runs_per_point == 0 {
        return Err(Error::Configuration(
            "scan needs at least one point and one run per point".to_string(),
        ));
    }
    let jobs: Vec<(usize, &Hamiltonian)> = points
        .iter()
        .enumerate()
        .flat_map(|(p, &h)| (0..runs_per_point).map(move |_| (p, h)))
        .collect();
    debug!("independent scan: {} runs over {} points", jobs.len(), points.len());

    let results = par_over_runs(&jobs, sequential, |k, &(_, hamiltonian)| {
        let mut sim = Simulation::new(
            topology,
            hamiltonian,
            initial.clone(),
            config.seed.wrapping_add(k as u64),
        )?;
        run_sweep_loop(&mut sim, config, interrupted, on_sweep)
    });

    let mut grouped: Vec<Vec<RunResult>> = (0..points.len()).map(|_| Vec::new()).collect();
    for ((p, _), res) in jobs.iter().zip(results) {
        grouped[*p].push(res?);
    }
    Ok(grouped)
}

/// One chain walked through `points` in order, each run starting from the
/// spins the previous one ended with. Sweeping a field up then down traces a
/// hysteresis loop.
///
/// The chain is seeded with `config.seed`. Stops after the first interrupted
/// run, so the output may be shorter than `points`.
pub fn run_carried(
    topology: &Topology,
    points: &[&Hamiltonian],
    initial: InitialState,
    config: &RunConfig,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<Vec<RunResult>> {
    let (&first, rest) = points
        .split_first()
        .ok_or_else(|| Error::Configuration("scan needs at least one point".to_string()))?;

    let mut sim = Simulation::new(topology, first, initial, config.seed)?;
    let mut results = Vec::with_capacity(points.len());
    let mut result = run_sweep_loop(&mut sim, config, interrupted, on_sweep)?;
    for &hamiltonian in rest {
        let stop = result.interrupted;
        results.push(result);
        if stop {
            return Ok(results);
        }
        sim = sim.continue_with(hamiltonian)?;
        result = run_sweep_loop(&mut sim, config, interrupted, on_sweep)?;
    }
    results.push(result);
    Ok(results)
}

/// [`Simulation::steps_to_threshold`] for `n_runs` fresh chains seeded
/// `base_seed + k`.
#[allow(clippy::too_many_arguments)]
pub fn first_passage_times(
    topology: &Topology,
    hamiltonian: &Hamiltonian,
    initial: &InitialState,
    n_runs: usize,
    base_seed: u64,
    layer: usize,
    threshold: f64,
    max_steps: usize,
    sequential: bool,
) -> Result<Vec<Option<usize>>> {
    let seeds: Vec<u64> = (0..n_runs as u64).map(|k| base_seed.wrapping_add(k)).collect();
    par_over_runs(&seeds, sequential, |_, &seed| {
        let mut sim = Simulation::new(topology, hamiltonian, initial.clone(), seed)?;
        sim.steps_to_threshold(layer, threshold, max_steps)
    })
    .into_iter()
    .collect()
}
