//! Spectral operators: linear, translation-invariant operators applied to a
//! periodic field by multiplication in Fourier space.
//!
//! Every variant only supplies its multiplier through [`SpectralMultiplier`];
//! the transform plumbing and the per-size cache live in [`SpectralOperator`].

mod derivative;
mod filtered;
mod hilbert;
mod translation;

pub use derivative::Derivative;
pub use filtered::{exponential_filter, FilteredDerivative, DEFAULT_FILTER_FRACTION};
pub use hilbert::HilbertTransform;
pub use translation::Translation;

use crate::error::{Result, SpectralError};
use crate::grid::wavenumbers;
use crate::traits::SpectralMultiplier;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Everything that depends only on the field length: wavenumbers,
/// multiplier and the planned transforms.
struct CacheEntry {
    len: usize,
    wavenumbers: Vec<f64>,
    multiplier: Vec<Complex64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

/// Size-keyed cache of a single multiplier. Rebuilt whenever the field
/// length differs from the last one seen.
#[derive(Default)]
pub struct MultiplierCache {
    entry: Option<CacheEntry>,
    rebuilds: usize,
}

impl MultiplierCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare<M: SpectralMultiplier>(
        &mut self,
        len: usize,
        dx: f64,
        provider: &M,
    ) -> Result<&mut CacheEntry> {
        let stale = self.entry.as_ref().map_or(true, |entry| entry.len != len);
        if stale {
            log::debug!("rebuilding spectral multiplier for {len} modes");
            let k = wavenumbers(len, dx);
            let multiplier = provider.multiplier(&k)?;
            SpectralError::check_len("Multiplier", len, multiplier.len())?;

            let mut planner = FftPlanner::<f64>::new();
            let forward = planner.plan_fft_forward(len);
            let inverse = planner.plan_fft_inverse(len);
            let scratch_len = forward
                .get_inplace_scratch_len()
                .max(inverse.get_inplace_scratch_len());

            self.entry = Some(CacheEntry {
                len,
                wavenumbers: k,
                multiplier,
                forward,
                inverse,
                scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
            });
            self.rebuilds += 1;
        }
        self.entry
            .as_mut()
            .ok_or_else(|| SpectralError::invalid_grid("Multiplier cache is empty."))
    }

    /// Drops the cached multiplier; the next application rebuilds it.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Field length of the cached multiplier, if any.
    pub fn cached_len(&self) -> Option<usize> {
        self.entry.as_ref().map(|entry| entry.len)
    }

    /// Number of times a multiplier has been computed.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn wavenumbers(&self) -> Option<&[f64]> {
        self.entry.as_ref().map(|entry| entry.wavenumbers.as_slice())
    }

    pub fn multiplier(&self) -> Option<&[Complex64]> {
        self.entry.as_ref().map(|entry| entry.multiplier.as_slice())
    }
}

/// Applies `ifft(fft(u) · m(k))` for the multiplier `m` of `M`.
pub struct SpectralOperator<M: SpectralMultiplier> {
    dx: f64,
    provider: M,
    cache: MultiplierCache,
}

pub type DerivativeOperator = SpectralOperator<Derivative>;
pub type FilteredDerivativeOperator = SpectralOperator<FilteredDerivative>;
pub type HilbertOperator = SpectralOperator<HilbertTransform>;
pub type TranslationOperator = SpectralOperator<Translation>;

impl<M: SpectralMultiplier> SpectralOperator<M> {
    pub fn new(dx: f64, provider: M) -> Result<Self> {
        if !(dx.is_finite() && dx > 0.0) {
            return Err(SpectralError::invalid_grid(format!(
                "Grid spacing must be positive and finite, got {dx}."
            )));
        }
        Ok(Self {
            dx,
            provider,
            cache: MultiplierCache::new(),
        })
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn provider(&self) -> &M {
        &self.provider
    }

    pub fn cache(&self) -> &MultiplierCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut MultiplierCache {
        &mut self.cache
    }

    /// Applies the operator and returns a new field of the same length.
    pub fn apply(&mut self, u: &[Complex64]) -> Result<Vec<Complex64>> {
        let mut out = vec![Complex64::new(0.0, 0.0); u.len()];
        self.apply_into(u, &mut out)?;
        Ok(out)
    }

    /// Applies the operator to a real field. The result is still complex.
    pub fn apply_real(&mut self, u: &[f64]) -> Result<Vec<Complex64>> {
        let field: Vec<Complex64> = u.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.apply(&field)
    }

    pub fn apply_into(&mut self, u: &[Complex64], out: &mut [Complex64]) -> Result<()> {
        SpectralError::check_len("Output buffer", u.len(), out.len())?;
        let len = u.len();
        if len < 2 {
            return Err(SpectralError::invalid_grid(format!(
                "Spectral operators need at least 2 samples, got {len}."
            )));
        }

        let entry = self.cache.prepare(len, self.dx, &self.provider)?;
        out.copy_from_slice(u);
        entry.forward.process_with_scratch(out, &mut entry.scratch);
        for (value, factor) in out.iter_mut().zip(&entry.multiplier) {
            *value *= *factor;
        }
        entry.inverse.process_with_scratch(out, &mut entry.scratch);

        // rustfft leaves the inverse unnormalised.
        let norm = 1.0 / len as f64;
        for value in out.iter_mut() {
            *value *= norm;
        }
        Ok(())
    }
}

impl SpectralOperator<Derivative> {
    pub fn derivative(dx: f64, order: u32) -> Result<Self> {
        Self::new(dx, Derivative::new(order))
    }
}

impl SpectralOperator<FilteredDerivative> {
    pub fn filtered_derivative(dx: f64, order: u32, filter: f64) -> Result<Self> {
        Self::new(dx, FilteredDerivative::new(order, filter)?)
    }
}

impl SpectralOperator<HilbertTransform> {
    pub fn hilbert(dx: f64) -> Result<Self> {
        Self::new(dx, HilbertTransform)
    }
}

impl SpectralOperator<Translation> {
    pub fn translation(dx: f64, offset: f64) -> Result<Self> {
        Self::new(dx, Translation::new(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::{DerivativeOperator, HilbertOperator, SpectralOperator, TranslationOperator};
    use crate::grid::Grid;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    fn max_abs_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn derivative_is_exact_on_resolvable_modes() {
        let n = 16;
        let grid = Grid::new(-1.0, 3.0, n).expect("grid");
        let length = 4.0;
        for order in 1..=3u32 {
            let mut op = DerivativeOperator::derivative(grid.dx(), order).expect("operator");
            for m in -(n as i64 / 2)..(n as i64 / 2) {
                let k = 2.0 * PI * m as f64 / length;
                let u = grid.sample(|x| Complex64::new(0.0, k * x).exp());
                let factor = Complex64::new(0.0, k).powu(order);
                let expected: Vec<Complex64> = u.iter().map(|v| factor * v).collect();
                let result = op.apply(&u).expect("apply");
                let tol = 1e-10 * k.abs().max(1.0).powi(order as i32);
                assert!(
                    max_abs_diff(&result, &expected) < tol,
                    "order {order}, mode {m} exceeded tolerance"
                );
            }
        }
    }

    #[test]
    fn cache_is_reused_for_same_length_and_rebuilt_otherwise() {
        let grid = Grid::new(0.0, 2.0 * PI, 32).expect("grid");
        let mut op = DerivativeOperator::derivative(grid.dx(), 1).expect("operator");
        let u = grid.sample(|x| x.sin() + 0.3 * (4.0 * x).cos());

        let first = op.apply(&u).expect("apply");
        let second = op.apply(&u).expect("apply");
        assert_eq!(first, second);
        assert_eq!(op.cache().rebuilds(), 1);
        assert_eq!(op.cache().cached_len(), Some(32));

        let shorter = vec![Complex64::new(1.0, 0.0); 8];
        op.apply(&shorter).expect("apply");
        assert_eq!(op.cache().rebuilds(), 2);
        assert_eq!(op.cache().cached_len(), Some(8));

        let third = op.apply(&u).expect("apply");
        assert_eq!(op.cache().rebuilds(), 3);
        assert_eq!(first, third);

        op.cache_mut().invalidate();
        assert_eq!(op.cache().cached_len(), None);
        let fourth = op.apply(&u).expect("apply");
        assert_eq!(first, fourth);
    }

    #[test]
    fn derivative_of_constant_vanishes() {
        let mut op = DerivativeOperator::derivative(0.1, 2).expect("operator");
        let result = op.apply_real(&[2.5; 10]).expect("apply");
        assert!(result.iter().all(|v| v.norm() < 1e-12));
    }

    #[test]
    fn hilbert_twice_negates_zero_mean_field() {
        let grid = Grid::new(-PI, PI, 64).expect("grid");
        let mut op = HilbertOperator::hilbert(grid.dx()).expect("operator");
        let u = grid.sample(|x| (3.0 * x).cos() + 0.5 * (7.0 * x).sin());
        let once = op.apply(&u).expect("apply");
        let twice = op.apply(&once).expect("apply");
        let negated: Vec<Complex64> = u.iter().map(|v| -v).collect();
        assert!(max_abs_diff(&twice, &negated) < 1e-12);
    }

    #[test]
    fn hilbert_maps_cosine_to_sine() {
        let grid = Grid::new(0.0, 2.0 * PI, 32).expect("grid");
        let mut op = HilbertOperator::hilbert(grid.dx()).expect("operator");
        let result = op.apply(&grid.sample(|x| (2.0 * x).cos())).expect("apply");
        let expected = grid.sample(|x| (2.0 * x).sin());
        assert!(max_abs_diff(&result, &expected) < 1e-12);
    }

    #[test]
    fn translation_shifts_periodic_field() {
        let grid = Grid::new(0.0, 2.0 * PI, 64).expect("grid");
        let offset = 0.7;
        let mut op = TranslationOperator::translation(grid.dx(), offset).expect("operator");
        let result = op.apply(&grid.sample(|x| (x.sin()).exp())).expect("apply");
        let expected = grid.sample(|x| ((x - offset).sin()).exp());
        assert!(max_abs_diff(&result, &expected) < 1e-10);
    }

    #[test]
    fn rejects_short_fields_and_bad_spacing() {
        let mut op = DerivativeOperator::derivative(0.5, 1).expect("operator");
        let err = op.apply(&[Complex64::new(1.0, 0.0)]).expect_err("too short");
        assert!(err.to_string().contains("at least 2 samples"));

        let mut out = vec![Complex64::new(0.0, 0.0); 3];
        assert!(op
            .apply_into(&[Complex64::new(1.0, 0.0); 4], &mut out)
            .is_err());

        assert!(SpectralOperator::derivative(0.0, 1).is_err());
        assert!(SpectralOperator::hilbert(f64::NAN).is_err());
    }
}
