use super::{check_layer, Simulation};
use crate::error::Result;

impl Simulation<'_> {
    /// First-passage time of a layer's magnetization above `threshold`.
    ///
    /// Performs elementary Metropolis attempts on uniformly random sites and
    /// returns how many were needed before `M_layer > threshold`, or `None`
    /// if it never happened within `max_steps`. A chain already above the
    /// threshold returns `Some(0)`.
    pub fn steps_to_threshold(
        &mut self,
        layer: usize,
        threshold: f64,
        max_steps: usize,
    ) -> Result<Option<usize>> {
        check_layer(self, layer)?;
        if self.magnetization(layer) > threshold {
            return Ok(Some(0));
        }
        for step in 1..=max_steps {
            if self.metropolis_attempt() && self.magnetization(layer) > threshold {
                return Ok(Some(step));
            }
        }
        Ok(None)
    }
}
