use crate::error::Result;
use crate::traits::SpectralMultiplier;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Exact spectral derivative of arbitrary order, multiplier `(i·k)^order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    pub order: u32,
}

impl Derivative {
    pub fn new(order: u32) -> Self {
        Self { order }
    }
}

impl Default for Derivative {
    fn default() -> Self {
        Self { order: 1 }
    }
}

impl SpectralMultiplier for Derivative {
    fn multiplier(&self, wavenumbers: &[f64]) -> Result<Vec<Complex64>> {
        Ok(wavenumbers
            .iter()
            .map(|&k| Complex64::new(0.0, k).powu(self.order))
            .collect())
    }
}
