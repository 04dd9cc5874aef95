use crate::error::{Error, Result};

use super::autocorrelation::{sokal_tau, AutocorrAccum};

/// One recorded measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sweeps completed when the sample was taken.
    pub sweep: usize,
    /// Total energy.
    pub energy: f64,
    /// Per-layer magnetization `M_ℓ = (1/N) Σ_v s(ℓ, v)`.
    pub magnetization: Vec<f64>,
}

/// Per-layer magnetization statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    /// ⟨M⟩.
    pub mean: f64,
    /// ⟨|M|⟩.
    pub mean_abs: f64,
    /// ⟨M²⟩ − ⟨M⟩².
    pub variance: f64,
    /// χ = (⟨M²⟩ − ⟨M⟩²) / T.
    pub susceptibility: f64,
    /// U = 1 − ⟨M⁴⟩ / (3⟨M²⟩²); 0 when ⟨M²⟩ = 0.
    pub binder: f64,
    /// Integrated autocorrelation time of M², in samples.
    pub autocorrelation_time: Option<f64>,
}

/// Averages over a sample sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub n_samples: usize,
    pub mean_energy: f64,
    /// ⟨E²⟩ − ⟨E⟩².
    pub energy_variance: f64,
    /// C = (⟨E²⟩ − ⟨E⟩²) / T².
    pub specific_heat: f64,
    /// C / N.
    pub specific_heat_per_vertex: f64,
    pub layers: Vec<LayerSummary>,
}

impl Summary {
    /// Summary of the concatenated sample sequences of independent runs at
    /// the same parameters.
    pub fn pooled(
        parts: &[&ObservableAccumulator],
        max_lag: Option<usize>,
    ) -> Result<Option<Self>> {
        Ok(ObservableAccumulator::pooled(parts)?.summary(max_lag))
    }

    /// `layers[0].mean`; single-layer shorthand.
    pub fn mean_magnetization(&self) -> f64 {
        self.layers[0].mean
    }

    pub fn susceptibility(&self) -> f64 {
        self.layers[0].susceptibility
    }
}

/// Ordered sample sequence of one run, or of several pooled runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableAccumulator {
    temperature: f64,
    n_layers: usize,
    n_vertices: usize,
    samples: Vec<Sample>,
    /// Lengths of the contiguous per-run segments of `samples`.
    segments: Vec<usize>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

impl ObservableAccumulator {
    pub fn new(temperature: f64, n_layers: usize, n_vertices: usize) -> Self {
        Self {
            temperature,
            n_layers,
            n_vertices,
            samples: Vec::new(),
            segments: vec![0],
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample. Its magnetization vector must have one entry per layer.
    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if sample.magnetization.len() != self.n_layers {
            return Err(Error::Configuration(format!(
                "sample has {} magnetizations, accumulator tracks {} layers",
                sample.magnetization.len(),
                self.n_layers
            )));
        }
        self.samples.push(sample);
        if let Some(last) = self.segments.last_mut() {
            *last += 1;
        }
        Ok(())
    }

    pub fn record(&mut self, sweep: usize, energy: f64, magnetization: Vec<f64>) -> Result<()> {
        self.push(Sample {
            sweep,
            energy,
            magnetization,
        })
    }

    /// Concatenate the samples of independent runs. All parts must share the
    /// temperature, layer count and vertex count.
    pub fn pooled(parts: &[&Self]) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| Error::Configuration("nothing to pool".to_string()))?;
        let mut out = Self::new(first.temperature, first.n_layers, first.n_vertices);
        out.segments.clear();
        for p in parts {
            if p.temperature != first.temperature
                || p.n_layers != first.n_layers
                || p.n_vertices != first.n_vertices
            {
                return Err(Error::Configuration(format!(
                    "cannot pool runs at T={} ({}x{}) with T={} ({}x{})",
                    p.temperature, p.n_layers, p.n_vertices, first.temperature, first.n_layers,
                    first.n_vertices
                )));
            }
            out.samples.extend_from_slice(&p.samples);
            out.segments.extend(p.segments.iter().copied().filter(|&n| n > 0));
        }
        if out.segments.is_empty() {
            out.segments.push(0);
        }
        Ok(out)
    }

    /// Mean, variance and derived quantities; `None` without samples.
    ///
    /// Variances are population variances computed in two passes. With
    /// `max_lag` set, the M² autocorrelation time is estimated per run segment
    /// and averaged weighted by segment length.
    pub fn summary(&self, max_lag: Option<usize>) -> Option<Summary> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len();
        let temp = self.temperature;

        let mean_energy = mean(self.samples.iter().map(|s| s.energy));
        let energy_variance = mean(self.samples.iter().map(|s| (s.energy - mean_energy).powi(2)));
        let specific_heat = energy_variance / (temp * temp);

        let taus = max_lag.map(|lag| self.autocorrelation_times(lag));

        let layers = (0..self.n_layers)
            .map(|l| {
                let m = || self.samples.iter().map(move |s| s.magnetization[l]);
                let mean_m = mean(m());
                let variance = mean(m().map(|v| (v - mean_m).powi(2)));
                let m2 = mean(m().map(|v| v * v));
                let m4 = mean(m().map(|v| v.powi(4)));
                let binder = if m2 > 0.0 {
                    1.0 - m4 / (3.0 * m2 * m2)
                } else {
                    0.0
                };
                LayerSummary {
                    mean: mean_m,
                    mean_abs: mean(m().map(f64::abs)),
                    variance,
                    susceptibility: variance / temp,
                    binder,
                    autocorrelation_time: taus.as_ref().map(|t| t[l]),
                }
            })
            .collect();

        Some(Summary {
            n_samples: n,
            mean_energy,
            energy_variance,
            specific_heat,
            specific_heat_per_vertex: specific_heat / self.n_vertices as f64,
            layers,
        })
    }

    fn autocorrelation_times(&self, max_lag: usize) -> Vec<f64> {
        let mut weighted = vec![0.0; self.n_layers];
        let mut start = 0;
        let mut m2 = vec![0.0; self.n_layers];
        for &len in &self.segments {
            let segment = &self.samples[start..start + len];
            start += len;
            if segment.is_empty() {
                continue;
            }
            let lag = max_lag.min(len.saturating_sub(1) / 4).max(1);
            let mut acc = AutocorrAccum::new(lag, self.n_layers);
            for s in segment {
                for (slot, &v) in m2.iter_mut().zip(&s.magnetization) {
                    *slot = v * v;
                }
                acc.push(&m2);
            }
            for (w, gamma) in weighted.iter_mut().zip(acc.finish()) {
                *w += sokal_tau(&gamma) * len as f64;
            }
        }
        let total = self.samples.len() as f64;
        weighted.iter().map(|w| w / total).collect()
    }
}
