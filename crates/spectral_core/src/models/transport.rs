use super::{bound, Model};
use crate::error::Result;
use crate::grid::Grid;
use crate::operators::{DerivativeOperator, HilbertOperator, SpectralOperator};
use num_complex::Complex64;

/// `u_t + c·u_x = 0`.
///
/// `ddt` computes `coefficient · ∂x u` with `coefficient = −c`, so the
/// default coefficient of −1 moves the profile right at unit speed.
pub struct OneWayWave {
    coefficient: f64,
    ddx: Option<DerivativeOperator>,
}

impl OneWayWave {
    pub fn new() -> Self {
        Self {
            coefficient: -1.0,
            ddx: None,
        }
    }

    pub fn with_speed(mut self, c: f64) -> Self {
        self.set_speed(c);
        self
    }

    pub fn set_speed(&mut self, c: f64) {
        self.coefficient = -c;
    }

    /// The propagation speed `c`.
    pub fn speed(&self) -> f64 {
        -self.coefficient
    }

    /// The factor multiplying `∂x u` in `ddt`.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

impl Default for OneWayWave {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for OneWayWave {
    fn name(&self) -> &'static str {
        "one_way_wave"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.ddx = Some(SpectralOperator::derivative(grid.dx(), 1)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let coefficient = self.coefficient;
        let mut du = bound(&mut self.ddx)?.apply(u)?;
        for value in &mut du {
            *value *= coefficient;
        }
        Ok(du)
    }
}

/// Inviscid Burgers equation in conservative form, `u_t + ½(u²)_x = 0`.
#[derive(Default)]
pub struct Burgers {
    ddx: Option<DerivativeOperator>,
}

impl Burgers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for Burgers {
    fn name(&self) -> &'static str {
        "burgers"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.ddx = Some(SpectralOperator::derivative(grid.dx(), 1)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let squared: Vec<Complex64> = u.iter().map(|&v| v * v).collect();
        let mut du = bound(&mut self.ddx)?.apply(&squared)?;
        for value in &mut du {
            *value *= -0.5;
        }
        Ok(du)
    }
}

/// `u_t = H[u]`.
#[derive(Default)]
pub struct HilbertEquation {
    hilbert: Option<HilbertOperator>,
}

impl HilbertEquation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for HilbertEquation {
    fn name(&self) -> &'static str {
        "hilbert"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.hilbert = Some(SpectralOperator::hilbert(grid.dx())?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        bound(&mut self.hilbert)?.apply(u)
    }
}

/// Korteweg-de Vries equation, `u_t − 6·u·u_x + u_xxx = 0`.
#[derive(Default)]
pub struct KdV {
    ddx: Option<DerivativeOperator>,
    dxxx: Option<DerivativeOperator>,
}

impl KdV {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for KdV {
    fn name(&self) -> &'static str {
        "kdv"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.ddx = Some(SpectralOperator::derivative(grid.dx(), 1)?);
        self.dxxx = Some(SpectralOperator::derivative(grid.dx(), 3)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let u_x = bound(&mut self.ddx)?.apply(u)?;
        let u_xxx = bound(&mut self.dxxx)?.apply(u)?;
        Ok(u
            .iter()
            .zip(&u_x)
            .zip(&u_xxx)
            .map(|((&v, &v_x), &v_xxx)| 6.0 * v * v_x - v_xxx)
            .collect())
    }
}
