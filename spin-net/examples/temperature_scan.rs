use std::sync::atomic::AtomicBool;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use spin_net::{
    run_independent, Hamiltonian, InitialState, Lattice, ModelParams, RunConfig, RunResult,
    Topology, Updater,
};

const L: usize = 32;
const N_TEMPS: usize = 12;
const RUNS_PER_TEMP: usize = 4;
const EQUILIBRATION: usize = 500;
const SAMPLING: usize = 2000;

fn main() -> spin_net::Result<()> {
    env_logger::init();

    let updater = std::env::args()
        .nth(1)
        .map_or(Ok(Updater::Wolff), |s| Updater::try_from(s.as_str()))
        .map_err(spin_net::Error::Configuration)?;

    let topology: Topology = Lattice::new(vec![L, L])?.into();
    let temps: Vec<f64> = (0..N_TEMPS)
        .map(|i| 1.5 + 1.5 * i as f64 / (N_TEMPS - 1) as f64)
        .collect();
    let points = temps
        .iter()
        .map(|&t| Hamiltonian::new(ModelParams::ising(t), &topology))
        .collect::<spin_net::Result<Vec<_>>>()?;
    let refs: Vec<&Hamiltonian> = points.iter().collect();

    let config = RunConfig::new(updater, EQUILIBRATION, SAMPLING).with_autocorrelation(100);
    let n_sweeps = (N_TEMPS * RUNS_PER_TEMP * (EQUILIBRATION + SAMPLING)) as u64;

    let pb = ProgressBar::new(n_sweeps);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );
    pb.set_message("sweeps");

    let interrupted = AtomicBool::new(false);
    let t0 = Instant::now();
    let groups = run_independent(
        &topology,
        &refs,
        RUNS_PER_TEMP,
        &InitialState::Random,
        &config,
        false,
        &interrupted,
        &|| pb.inc(1),
    )?;
    pb.finish();

    println!(
        "Lattice: {L}x{L}  |  {updater:?}  |  {RUNS_PER_TEMP} runs x {SAMPLING} samples per temperature"
    );
    println!(
        "{:>6} {:>10} {:>8} {:>8} {:>10} {:>8} {:>7}",
        "T", "E/N", "<|M|>", "U", "C/N", "chi", "tau"
    );
    println!("{}", "-".repeat(63));
    let n = (L * L) as f64;
    for (t, runs) in temps.iter().zip(&groups) {
        let Some(s) = RunResult::pooled_summary(runs, config.autocorrelation_max_lag)? else {
            continue;
        };
        let layer = &s.layers[0];
        println!(
            "{:>6.3} {:>10.4} {:>8.4} {:>8.4} {:>10.4} {:>8.3} {:>7.2}",
            t,
            s.mean_energy / n,
            layer.mean_abs,
            layer.binder,
            s.specific_heat_per_vertex,
            layer.susceptibility * n,
            layer.autocorrelation_time.unwrap_or(f64::NAN),
        );
    }
    println!("Total: {:.3} s", t0.elapsed().as_secs_f64());
    Ok(())
}
