pub mod autocorrelation;
pub mod observables;
pub mod results;

pub use autocorrelation::{sokal_tau, AutocorrAccum};
pub use observables::{LayerSummary, ObservableAccumulator, Sample, Summary};
pub use results::RunResult;
