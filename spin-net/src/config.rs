use std::fmt;

use validator::{Validate, ValidationError};

use crate::geometry::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Updater {
    Metropolis,
    Wolff,
}

impl TryFrom<&str> for Updater {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "metropolis" => Ok(Self::Metropolis),
            "wolff" => Ok(Self::Wolff),
            _ => Err(format!(
                "unknown updater '{s}', expected 'metropolis' or 'wolff'"
            )),
        }
    }
}

/// Order in which a Metropolis sweep visits (layer, vertex) sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteSelection {
    /// Every site exactly once per sweep, in index order.
    #[default]
    Sequential,
    /// `n_sites` uniformly random picks per sweep.
    Random,
}

impl TryFrom<&str> for SiteSelection {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "random" => Ok(Self::Random),
            _ => Err(format!(
                "unknown site_selection '{s}', expected 'sequential' or 'random'"
            )),
        }
    }
}

fn validate_model_params(p: &ModelParams) -> Result<(), ValidationError> {
    if !(p.temperature.is_finite() && p.temperature > 0.0) {
        return Err(ValidationError::new("temperature must be finite and > 0"));
    }
    if !(p.coupling.is_finite() && p.field.is_finite() && p.interlayer.is_finite()) {
        return Err(ValidationError::new(
            "coupling, field and interlayer must be finite",
        ));
    }
    if !(0.0..=1.0).contains(&p.self_identity) {
        return Err(ValidationError::new("self_identity must lie in [0, 1]"));
    }
    if p.n_layers < 1 {
        return Err(ValidationError::new("n_layers must be >= 1"));
    }
    if let Some(ref per_layer) = p.layer_couplings {
        if per_layer.len() != p.n_layers {
            return Err(ValidationError::new(
                "layer_couplings must have one entry per layer",
            ));
        }
        if per_layer.iter().any(|j| !j.is_finite()) {
            return Err(ValidationError::new("layer_couplings must be finite"));
        }
    }
    Ok(())
}

/// Hamiltonian parameters, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_model_params"))]
pub struct ModelParams {
    /// `T > 0`, in units where `k_B = 1`.
    pub temperature: f64,
    /// Global coupling `J`, multiplied by each bond's weight.
    pub coupling: f64,
    /// Per-layer override of `coupling`.
    pub layer_couplings: Option<Vec<f64>>,
    /// Uniform external field `H`.
    pub field: f64,
    /// Self-identity weight `ε ∈ [0, 1]`.
    pub self_identity: f64,
    /// Inter-layer coupling `κ` between spins of the same vertex.
    pub interlayer: f64,
    pub n_layers: usize,
}

impl ModelParams {
    /// Single-layer ferromagnet with `J = 1` and no field.
    pub fn ising(temperature: f64) -> Self {
        Self {
            temperature,
            coupling: 1.0,
            layer_couplings: None,
            field: 0.0,
            self_identity: 0.0,
            interlayer: 0.0,
            n_layers: 1,
        }
    }

    pub fn with_coupling(mut self, coupling: f64) -> Self {
        self.coupling = coupling;
        self
    }

    pub fn with_field(mut self, field: f64) -> Self {
        self.field = field;
        self
    }

    pub fn with_self_identity(mut self, epsilon: f64) -> Self {
        self.self_identity = epsilon;
        self
    }

    /// Two or more layers coupled with strength `kappa`.
    pub fn with_layers(mut self, n_layers: usize, kappa: f64) -> Self {
        self.n_layers = n_layers;
        self.interlayer = kappa;
        self
    }

    pub fn with_layer_couplings(mut self, couplings: Vec<f64>) -> Self {
        self.layer_couplings = Some(couplings);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[inline]
    pub fn coupling_for(&self, layer: usize) -> f64 {
        self.layer_couplings
            .as_ref()
            .map_or(self.coupling, |per_layer| per_layer[layer])
    }
}

fn validate_run_config(cfg: &RunConfig) -> Result<(), ValidationError> {
    if cfg.sampling_interval < 1 {
        return Err(ValidationError::new("sampling_interval must be >= 1"));
    }
    if cfg.autocorrelation_max_lag == Some(0) {
        return Err(ValidationError::new("autocorrelation_max_lag must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_run_config"))]
pub struct RunConfig {
    pub updater: Updater,
    /// Sweeps run before any sample is recorded.
    pub equilibration_sweeps: usize,
    pub sampling_sweeps: usize,
    /// Record one sample every this many sampling sweeps.
    pub sampling_interval: usize,
    pub seed: u64,
    pub site_selection: SiteSelection,
    /// Compute the integrated autocorrelation time of M² up to this lag.
    pub autocorrelation_max_lag: Option<usize>,
}

impl RunConfig {
    pub fn new(updater: Updater, equilibration_sweeps: usize, sampling_sweeps: usize) -> Self {
        Self {
            updater,
            equilibration_sweeps,
            sampling_sweeps,
            sampling_interval: 1,
            seed: 42,
            site_selection: SiteSelection::Sequential,
            autocorrelation_max_lag: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sampling_interval(mut self, interval: usize) -> Self {
        self.sampling_interval = interval;
        self
    }

    pub fn with_site_selection(mut self, selection: SiteSelection) -> Self {
        self.site_selection = selection;
        self
    }

    pub fn with_autocorrelation(mut self, max_lag: usize) -> Self {
        self.autocorrelation_max_lag = Some(max_lag);
        self
    }

    /// Known approximations of this run setup. Empty for Metropolis.
    pub fn warnings(&self, params: &ModelParams, topology: &Topology) -> Vec<ConfigWarning> {
        let mut out = Vec::new();
        if self.updater != Updater::Wolff {
            return out;
        }
        let field = params.field != 0.0;
        let self_identity = params.self_identity > 0.0;
        let interlayer = params.n_layers > 1 && params.interlayer != 0.0;
        if field || self_identity || interlayer {
            out.push(ConfigWarning::WolffNotDetailedBalanced {
                field,
                self_identity,
                interlayer,
            });
        }
        if topology.has_oriented_edges() {
            out.push(ConfigWarning::WolffIgnoresOrientedEdges);
        }
        out
    }
}

/// A run setup that is accepted but samples only approximately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Cluster growth ignores these terms, so the Wolff move no longer
    /// satisfies detailed balance.
    WolffNotDetailedBalanced {
        field: bool,
        self_identity: bool,
        interlayer: bool,
    },
    /// Oriented edges never join a cluster.
    WolffIgnoresOrientedEdges,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::WolffNotDetailedBalanced {
                field,
                self_identity,
                interlayer,
            } => {
                let terms: Vec<&str> = [
                    (field, "external field"),
                    (self_identity, "self-identity bias"),
                    (interlayer, "inter-layer coupling"),
                ]
                .iter()
                .filter(|(on, _)| *on)
                .map(|&(_, name)| name)
                .collect();
                write!(
                    f,
                    "Wolff clusters ignore the {}; the move is an approximate sampler",
                    terms.join(" and ")
                )
            }
            Self::WolffIgnoresOrientedEdges => {
                write!(f, "Wolff clusters grow only along non-oriented edges")
            }
        }
    }
}
