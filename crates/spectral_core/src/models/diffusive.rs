use super::{bound, Model, ParameterField};
use crate::error::{Result, SpectralError};
use crate::grid::Grid;
use crate::operators::{
    DerivativeOperator, FilteredDerivativeOperator, SpectralOperator, DEFAULT_FILTER_FRACTION,
};
use num_complex::Complex64;

/// `u_t = u_xx`.
#[derive(Default)]
pub struct Heat {
    dxx: Option<DerivativeOperator>,
}

impl Heat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for Heat {
    fn name(&self) -> &'static str {
        "heat"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.dxx = Some(SpectralOperator::derivative(grid.dx(), 2)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        bound(&mut self.dxx)?.apply(u)
    }
}

/// Variable-coefficient diffusion, `u_t = (D(x)·u_x)_x`, with `D = 1` unless
/// set otherwise.
pub struct Diffusion {
    diffusion: ParameterField,
    ddx: Option<FilteredDerivativeOperator>,
}

impl Diffusion {
    pub fn new() -> Self {
        Self {
            diffusion: ParameterField::constant(1.0),
            ddx: None,
        }
    }

    pub fn with_diffusion(mut self, d: impl Fn(f64) -> f64 + 'static) -> Self {
        self.diffusion.set_fn(d);
        self
    }

    pub fn set_diffusion(&mut self, d: impl Fn(f64) -> f64 + 'static) {
        self.diffusion.set_fn(d);
    }

    pub fn set_diffusion_samples(&mut self, samples: Vec<f64>) -> Result<()> {
        self.diffusion.set_samples(samples)
    }

    pub fn diffusion(&self) -> &[f64] {
        self.diffusion.samples()
    }
}

impl Default for Diffusion {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Diffusion {
    fn name(&self) -> &'static str {
        "diffusion"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.diffusion.bind(grid)?;
        self.ddx = Some(SpectralOperator::filtered_derivative(
            grid.dx(),
            1,
            DEFAULT_FILTER_FRACTION,
        )?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let ddx = bound(&mut self.ddx)?;
        let diffusion = self.diffusion.samples();
        SpectralError::check_len("Field", diffusion.len(), u.len())?;
        let u_x = ddx.apply(u)?;
        let flux: Vec<Complex64> = u_x
            .iter()
            .zip(diffusion)
            .map(|(&v, &d)| v * d)
            .collect();
        ddx.apply(&flux)
    }
}
