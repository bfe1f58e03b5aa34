use crate::error::{Result, SpectralError};
use crate::traits::SpectralMultiplier;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Fraction of the spectrum damped when no filter is given.
pub const DEFAULT_FILTER_FRACTION: f64 = 1.0 / 3.0;

/// Steepness of the exponential filter.
const FILTER_POWER: i32 = 8;

/// Spectral derivative damped by an exponential low-pass filter,
/// multiplier `(i·k)^order · σ(k)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilteredDerivative {
    order: u32,
    unfiltered: f64,
}

impl FilteredDerivative {
    /// `filter` is the damped fraction of the spectrum, in `[0, 1)`.
    pub fn new(order: u32, filter: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&filter) {
            return Err(SpectralError::invalid_grid(format!(
                "Filter fraction must lie in [0, 1), got {filter}."
            )));
        }
        Ok(Self {
            order,
            unfiltered: 1.0 - filter,
        })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn filter(&self) -> f64 {
        1.0 - self.unfiltered
    }
}

impl SpectralMultiplier for FilteredDerivative {
    fn multiplier(&self, wavenumbers: &[f64]) -> Result<Vec<Complex64>> {
        let sigma = exponential_filter(wavenumbers, self.unfiltered)?;
        Ok(wavenumbers
            .iter()
            .zip(sigma)
            .map(|(&k, s)| Complex64::new(0.0, k).powu(self.order) * s)
            .collect())
    }
}

/// `σ(k) = exp(−(η/u)^8)` with `η = |k|/k_max`. Modes with `η ≤ u` are left
/// almost untouched; the Nyquist mode is driven towards zero.
pub fn exponential_filter(wavenumbers: &[f64], unfiltered: f64) -> Result<Vec<f64>> {
    let k_max = wavenumbers.iter().fold(0.0_f64, |acc, k| acc.max(k.abs()));
    if !(k_max.is_finite() && k_max > 0.0) {
        return Err(SpectralError::invalid_grid(
            "Filter is undefined: all wavenumbers are zero.",
        ));
    }
    Ok(wavenumbers
        .iter()
        .map(|k| {
            let eta = k.abs() / k_max;
            (-(eta / unfiltered).powi(FILTER_POWER)).exp()
        })
        .collect())
}
