use crate::error::Result;
use crate::traits::SpectralMultiplier;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Periodic Hilbert transform, multiplier `−i·sign(k)` with `sign(0) = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HilbertTransform;

impl SpectralMultiplier for HilbertTransform {
    fn multiplier(&self, wavenumbers: &[f64]) -> Result<Vec<Complex64>> {
        Ok(wavenumbers
            .iter()
            .map(|&k| {
                // f64::signum maps 0.0 to 1.0.
                let sign = if k == 0.0 { 0.0 } else { k.signum() };
                Complex64::new(0.0, -sign)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::HilbertTransform;
    use crate::traits::SpectralMultiplier;
    use num_complex::Complex64;

    #[test]
    fn mean_mode_is_removed() {
        let m = HilbertTransform.multiplier(&[0.0, 2.0, -2.0]).expect("multiplier");
        assert_eq!(m[0], Complex64::new(0.0, 0.0));
        assert_eq!(m[1], Complex64::new(0.0, -1.0));
        assert_eq!(m[2], Complex64::new(0.0, 1.0));
    }
}
