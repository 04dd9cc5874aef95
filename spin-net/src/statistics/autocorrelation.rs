/// Streaming autocorrelation accumulator using a ring buffer.
///
/// Computes the normalized autocorrelation function Γ(δ) of one time series
/// per channel (one channel per spin layer) without storing the full history.
/// Memory is O(max_lag × n_channels).
pub struct AutocorrAccum {
    max_lag: usize,
    n_channels: usize,
    /// Ring buffer of the last `max_lag + 1` values, shape [n_channels][max_lag+1].
    ring: Vec<Vec<f64>>,
    /// Running sum of o, shape [n_channels].
    sum_o: Vec<f64>,
    /// Running sum of o², shape [n_channels].
    sum_o2: Vec<f64>,
    /// Running sum of o(t)·o(t−δ), shape [n_channels][max_lag+1].
    sum_prod: Vec<Vec<f64>>,
    n_recorded: usize,
    ring_pos: usize,
}

impl AutocorrAccum {
    pub fn new(max_lag: usize, n_channels: usize) -> Self {
        let len = max_lag + 1;
        Self {
            max_lag,
            n_channels,
            ring: (0..n_channels).map(|_| vec![0.0; len]).collect(),
            sum_o: vec![0.0; n_channels],
            sum_o2: vec![0.0; n_channels],
            sum_prod: (0..n_channels).map(|_| vec![0.0; len]).collect(),
            n_recorded: 0,
            ring_pos: 0,
        }
    }

    pub fn n_recorded(&self) -> usize {
        self.n_recorded
    }

    #[allow(clippy::needless_range_loop)]
    pub fn push(&mut self, values: &[f64]) {
        let pos = self.ring_pos;
        let len = self.max_lag + 1;
        for c in 0..self.n_channels {
            let o = values[c];
            self.ring[c][pos] = o;
            self.sum_o[c] += o;
            self.sum_o2[c] += o * o;

            let n_back = self.n_recorded.min(self.max_lag);
            for delta in 0..=n_back {
                let idx = (pos + len - delta) % len;
                self.sum_prod[c][delta] += o * self.ring[c][idx];
            }
        }
        self.n_recorded += 1;
        self.ring_pos = (pos + 1) % len;
    }

    /// Γ(δ) for δ = 0..=max_lag, per channel. A constant series gives
    /// Γ(0) = 1 and zero elsewhere.
    pub fn finish(&self) -> Vec<Vec<f64>> {
        let m = self.n_recorded as f64;
        (0..self.n_channels)
            .map(|c| {
                let mean = self.sum_o[c] / m;
                let var = self.sum_o2[c] / m - mean * mean;
                (0..=self.max_lag)
                    .map(|delta| {
                        let count = self.n_recorded.saturating_sub(delta) as f64;
                        if count <= 0.0 || var <= 1e-12 * mean.abs().max(1.0) {
                            return if delta == 0 { 1.0 } else { 0.0 };
                        }
                        (self.sum_prod[c][delta] / count - mean * mean) / var
                    })
                    .collect()
            })
            .collect()
    }
}

/// Integrated autocorrelation time with Sokal's automatic window (c = 5).
pub fn sokal_tau(gamma: &[f64]) -> f64 {
    let mut tau = 0.5;
    for (w, &g) in gamma.iter().enumerate().skip(1) {
        tau += g;
        if w as f64 >= 5.0 * tau {
            return tau;
        }
    }
    tau
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_white_noise_is_uncorrelated() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);
        let mut acc = AutocorrAccum::new(10, 1);
        for _ in 0..50_000 {
            acc.push(&[rng.gen::<f64>()]);
        }
        let gamma = &acc.finish()[0];
        assert_relative_eq!(gamma[0], 1.0, epsilon = 1e-9);
        for &g in &gamma[1..] {
            assert!(g.abs() < 0.03, "{g}");
        }
        assert!((sokal_tau(gamma) - 0.5).abs() < 0.1);
    }

    #[test]
    fn test_ar1_matches_geometric_decay() {
        // x_t = a x_{t-1} + noise has Γ(δ) = a^δ and τ = (1 + a) / (2 (1 - a))
        let a = 0.8;
        let mut rng = Xoshiro256StarStar::seed_from_u64(12);
        let mut acc = AutocorrAccum::new(60, 1);
        let mut x = 0.0;
        for _ in 0..400_000 {
            x = a * x + (rng.gen::<f64>() - 0.5);
            acc.push(&[x]);
        }
        let gamma = &acc.finish()[0];
        for delta in [1, 2, 5] {
            assert!((gamma[delta] - f64::powi(a, delta as i32)).abs() < 0.02);
        }
        let tau = sokal_tau(gamma);
        let exact = (1.0 + a) / (2.0 * (1.0 - a));
        assert!((tau - exact).abs() / exact < 0.1, "tau {tau} vs {exact}");
    }

    #[test]
    fn test_lag_equal_to_window_uses_old_value() {
        let mut acc = AutocorrAccum::new(2, 1);
        for v in [1.0, 2.0, 3.0, 4.0] {
            acc.push(&[v]);
        }
        // pairs at lag 2: (3,1), (4,2)
        assert_relative_eq!(acc.sum_prod[0][2], 3.0 + 8.0);
    }

    #[test]
    fn test_constant_series() {
        let mut acc = AutocorrAccum::new(3, 2);
        for _ in 0..10 {
            acc.push(&[1.0, 0.25]);
        }
        for gamma in acc.finish() {
            assert_eq!(gamma, vec![1.0, 0.0, 0.0, 0.0]);
        }
    }
}
