use crate::config::ConfigWarning;
use crate::error::Result;
use crate::spins::SpinConfig;

use super::observables::{ObservableAccumulator, Sample, Summary};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Every sample recorded during the sampling phase, in order.
    pub observables: ObservableAccumulator,
    /// `None` when no sample was recorded.
    pub summary: Option<Summary>,
    /// Spin configuration after the last completed sweep.
    pub spins: SpinConfig,
    /// Sweeps completed by the chain so far, equilibration included.
    pub sweeps_done: usize,
    /// The run stopped early on the cancellation flag.
    pub interrupted: bool,
    pub warnings: Vec<ConfigWarning>,
    /// Metropolis runs only.
    pub acceptance_rate: Option<f64>,
    /// Wolff runs only: mean flipped cluster size over all moves.
    pub mean_cluster_size: Option<f64>,
}

impl RunResult {
    pub fn samples(&self) -> &[Sample] {
        self.observables.samples()
    }

    /// Pool the samples of independent runs at the same parameters.
    pub fn pooled_summary(results: &[Self], max_lag: Option<usize>) -> Result<Option<Summary>> {
        let parts: Vec<&ObservableAccumulator> = results.iter().map(|r| &r.observables).collect();
        Summary::pooled(&parts, max_lag)
    }
}
