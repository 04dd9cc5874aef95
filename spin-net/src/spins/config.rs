use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::error::{Error, Result};

/// Layered ±1 spin storage over the vertices of one topology.
///
/// Layer `l` occupies `spins[l * n_vertices .. (l + 1) * n_vertices]`.
/// Pinned sites hold a fixed value and are skipped by every updater.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinConfig {
    n_layers: usize,
    n_vertices: usize,
    spins: Vec<i8>,
    pinned: Vec<bool>,
    n_pinned: usize,
}

#[inline]
fn check_spin(value: i8) -> Result<i8> {
    match value {
        1 | -1 => Ok(value),
        _ => Err(Error::InvalidSpin { value }),
    }
}

impl SpinConfig {
    /// All spins set to `value`.
    pub fn uniform(n_layers: usize, n_vertices: usize, value: i8) -> Result<Self> {
        let value = check_spin(value)?;
        if n_layers == 0 || n_vertices == 0 {
            return Err(Error::Configuration(format!(
                "spin configuration needs at least one layer and one vertex, got {n_layers}x{n_vertices}"
            )));
        }
        let len = n_layers * n_vertices;
        Ok(Self {
            n_layers,
            n_vertices,
            spins: vec![value; len],
            pinned: vec![false; len],
            n_pinned: 0,
        })
    }

    /// I.i.d. uniform ±1 spins drawn from a stream seeded with `seed`.
    pub fn random(n_layers: usize, n_vertices: usize, seed: u64) -> Result<Self> {
        let mut cfg = Self::uniform(n_layers, n_vertices, 1)?;
        cfg.randomize(seed);
        Ok(cfg)
    }

    /// Build from per-layer vectors, validating every value.
    pub fn from_layers(layers: Vec<Vec<i8>>) -> Result<Self> {
        let n_layers = layers.len();
        let n_vertices = layers.first().map_or(0, |l| l.len());
        if let Some(bad) = layers.iter().find(|l| l.len() != n_vertices) {
            return Err(Error::Configuration(format!(
                "layers have different lengths ({} vs {n_vertices})",
                bad.len()
            )));
        }
        let mut cfg = Self::uniform(n_layers, n_vertices, 1)?;
        for (slot, &v) in cfg.spins.iter_mut().zip(layers.iter().flatten()) {
            *slot = check_spin(v)?;
        }
        Ok(cfg)
    }

    #[inline]
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    /// Number of (layer, vertex) sites.
    #[inline]
    pub fn n_sites(&self) -> usize {
        self.spins.len()
    }

    #[inline]
    pub(crate) fn site(&self, layer: usize, vertex: usize) -> usize {
        layer * self.n_vertices + vertex
    }

    fn checked_site(&self, layer: usize, vertex: usize) -> Result<usize> {
        if layer >= self.n_layers || vertex >= self.n_vertices {
            return Err(Error::Configuration(format!(
                "site ({layer}, {vertex}) outside {} layers x {} vertices",
                self.n_layers, self.n_vertices
            )));
        }
        Ok(self.site(layer, vertex))
    }

    /// Spin at (`layer`, `vertex`). Panics if out of range, like slice indexing.
    #[inline]
    pub fn get(&self, layer: usize, vertex: usize) -> i8 {
        self.spins[self.site(layer, vertex)]
    }

    /// Store `value`, which must be ±1. Pinned sites keep their pinned value
    /// and report a configuration error.
    pub fn set(&mut self, layer: usize, vertex: usize, value: i8) -> Result<()> {
        let value = check_spin(value)?;
        let idx = self.checked_site(layer, vertex)?;
        if self.pinned[idx] {
            return Err(Error::Configuration(format!(
                "site ({layer}, {vertex}) is pinned"
            )));
        }
        self.spins[idx] = value;
        Ok(())
    }

    /// Toggle one spin in place.
    #[inline]
    pub fn flip(&mut self, layer: usize, vertex: usize) {
        let idx = self.site(layer, vertex);
        self.flip_site(idx);
    }

    #[inline]
    pub(crate) fn flip_site(&mut self, site: usize) {
        self.spins[site] = -self.spins[site];
    }

    #[inline]
    pub(crate) fn spin_at(&self, site: usize) -> i8 {
        self.spins[site]
    }

    /// Re-draw every non-pinned spin as i.i.d. uniform ±1.
    pub fn randomize(&mut self, seed: u64) {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        self.randomize_from(&mut rng);
    }

    /// [`SpinConfig::randomize`] drawing from a caller-owned stream.
    pub fn randomize_from<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (s, &p) in self.spins.iter_mut().zip(self.pinned.iter()) {
            let v = if rng.gen::<f64>() < 0.5 { -1 } else { 1 };
            if !p {
                *s = v;
            }
        }
    }

    /// Set every non-pinned spin to `value`.
    pub fn fill(&mut self, value: i8) -> Result<()> {
        let value = check_spin(value)?;
        for (s, &p) in self.spins.iter_mut().zip(self.pinned.iter()) {
            if !p {
                *s = value;
            }
        }
        Ok(())
    }

    /// Hold (`layer`, `vertex`) at `value` for the rest of the run.
    pub fn pin(&mut self, layer: usize, vertex: usize, value: i8) -> Result<()> {
        let value = check_spin(value)?;
        let idx = self.checked_site(layer, vertex)?;
        self.spins[idx] = value;
        if !self.pinned[idx] {
            self.pinned[idx] = true;
            self.n_pinned += 1;
        }
        Ok(())
    }

    pub fn unpin(&mut self, layer: usize, vertex: usize) -> Result<()> {
        let idx = self.checked_site(layer, vertex)?;
        if self.pinned[idx] {
            self.pinned[idx] = false;
            self.n_pinned -= 1;
        }
        Ok(())
    }

    #[inline]
    pub fn is_pinned(&self, layer: usize, vertex: usize) -> bool {
        self.pinned[self.site(layer, vertex)]
    }

    #[inline]
    pub(crate) fn is_pinned_site(&self, site: usize) -> bool {
        self.pinned[site]
    }

    pub fn n_pinned(&self) -> usize {
        self.n_pinned
    }

    /// Sites (flat indices) an updater may flip.
    pub(crate) fn free_sites(&self) -> Vec<u32> {
        (0..self.spins.len() as u32)
            .filter(|&i| !self.pinned[i as usize])
            .collect()
    }

    pub fn layer(&self, layer: usize) -> &[i8] {
        &self.spins[layer * self.n_vertices..(layer + 1) * self.n_vertices]
    }

    /// All spins, layer-major.
    pub fn as_slice(&self) -> &[i8] {
        &self.spins
    }

    /// Σ_v spin(layer, v).
    pub fn layer_sum(&self, layer: usize) -> i64 {
        self.layer(layer).iter().map(|&s| s as i64).sum()
    }

    /// `M = (1/N) Σ_v spin(layer, v)`.
    pub fn magnetization(&self, layer: usize) -> f64 {
        self.layer_sum(layer) as f64 / self.n_vertices as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rejects_non_unit_values() {
        let mut cfg = SpinConfig::uniform(2, 4, 1).unwrap();
        assert_eq!(cfg.set(0, 1, 0), Err(Error::InvalidSpin { value: 0 }));
        assert_eq!(cfg.set(1, 1, 2), Err(Error::InvalidSpin { value: 2 }));
        cfg.set(1, 3, -1).unwrap();
        assert_eq!(cfg.get(1, 3), -1);
        assert_eq!(cfg.get(0, 3), 1);
        assert!(matches!(cfg.set(2, 0, 1), Err(Error::Configuration(_))));
        assert!(matches!(
            SpinConfig::uniform(1, 4, 3),
            Err(Error::InvalidSpin { value: 3 })
        ));
    }

    #[test]
    fn test_randomize_is_seeded_and_binary() {
        let a = SpinConfig::random(2, 64, 7).unwrap();
        let b = SpinConfig::random(2, 64, 7).unwrap();
        let c = SpinConfig::random(2, 64, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.as_slice(), c.as_slice());
        assert!(a.as_slice().iter().all(|&s| s == 1 || s == -1));
        // both signs appear in 128 fair draws
        assert!(a.as_slice().contains(&1) && a.as_slice().contains(&-1));
    }

    #[test]
    fn test_flip_and_magnetization() {
        let mut cfg = SpinConfig::uniform(1, 4, -1).unwrap();
        assert_eq!(cfg.magnetization(0), -1.0);
        cfg.flip(0, 2);
        cfg.flip(0, 3);
        assert_eq!(cfg.layer(0), &[-1, -1, 1, 1]);
        assert_eq!(cfg.magnetization(0), 0.0);
    }

    #[test]
    fn test_pinned_sites_survive_resets() {
        let mut cfg = SpinConfig::uniform(1, 8, -1).unwrap();
        cfg.pin(0, 5, 1).unwrap();
        cfg.fill(-1).unwrap();
        cfg.randomize(3);
        assert_eq!(cfg.get(0, 5), 1);
        assert!(cfg.is_pinned(0, 5));
        assert!(cfg.set(0, 5, -1).is_err());
        assert_eq!(cfg.free_sites().len(), 7);
        cfg.unpin(0, 5).unwrap();
        assert_eq!(cfg.n_pinned(), 0);
    }

    #[test]
    fn test_from_layers_validates() {
        let cfg = SpinConfig::from_layers(vec![vec![1, -1], vec![-1, -1]]).unwrap();
        assert_eq!(cfg.get(1, 0), -1);
        assert_eq!(cfg.n_sites(), 4);
        assert!(SpinConfig::from_layers(vec![vec![1, 0]]).is_err());
        assert!(SpinConfig::from_layers(vec![vec![1], vec![1, 1]]).is_err());
        assert!(SpinConfig::from_layers(vec![]).is_err());
    }
}
