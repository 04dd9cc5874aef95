//! Ising-type Monte Carlo on periodic lattices and general weighted graphs.
//!
//! A [`Topology`] fixes who interacts with whom, a [`Hamiltonian`] fixes the
//! energy, and a [`Simulation`] owns the spins and random stream of one Markov
//! chain driven by Metropolis sweeps or Wolff cluster moves.

pub mod clusters;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mcmc;
pub mod simulation;
pub mod spins;
pub mod statistics;

mod parallel;

pub use config::{ConfigWarning, ModelParams, RunConfig, SiteSelection, Updater};
pub use error::{Error, Result};
pub use geometry::{Edge, Graph, GraphOptions, Lattice, Topology};
pub use simulation::{
    first_passage_times, run_carried, run_independent, run_sweep_loop, simulate, InitialState,
    Simulation,
};
pub use spins::{Hamiltonian, SpinConfig};
pub use statistics::{LayerSummary, ObservableAccumulator, RunResult, Sample, Summary};
