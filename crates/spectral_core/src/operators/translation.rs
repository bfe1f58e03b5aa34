use crate::error::Result;
use crate::traits::SpectralMultiplier;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Shift by `offset` in physical space, multiplier `exp(−i·k·offset)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub offset: f64,
}

impl Translation {
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl SpectralMultiplier for Translation {
    fn multiplier(&self, wavenumbers: &[f64]) -> Result<Vec<Complex64>> {
        Ok(wavenumbers
            .iter()
            .map(|&k| Complex64::from_polar(1.0, -k * self.offset))
            .collect())
    }
}
