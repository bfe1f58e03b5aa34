use super::{bound, Model, ParameterField};
use crate::error::{Result, SpectralError};
use crate::grid::Grid;
use crate::operators::{FilteredDerivativeOperator, SpectralOperator, DEFAULT_FILTER_FRACTION};
use num_complex::Complex64;

const MINUS_I: Complex64 = Complex64::new(0.0, -1.0);

fn filtered_laplacian(grid: &Grid) -> Result<FilteredDerivativeOperator> {
    SpectralOperator::filtered_derivative(grid.dx(), 2, DEFAULT_FILTER_FRACTION)
}

/// Linear Schrödinger equation `i·u_t = (−½·∂xx + V(x))·u`, with a zero
/// potential unless set otherwise.
pub struct Schrodinger {
    potential: ParameterField,
    dxx: Option<FilteredDerivativeOperator>,
}

impl Schrodinger {
    pub fn new() -> Self {
        Self {
            potential: ParameterField::constant(0.0),
            dxx: None,
        }
    }

    pub fn with_potential(mut self, v: impl Fn(f64) -> f64 + 'static) -> Self {
        self.potential.set_fn(v);
        self
    }

    pub fn set_potential(&mut self, v: impl Fn(f64) -> f64 + 'static) {
        self.potential.set_fn(v);
    }

    pub fn set_potential_samples(&mut self, samples: Vec<f64>) -> Result<()> {
        self.potential.set_samples(samples)
    }

    pub fn potential(&self) -> &[f64] {
        self.potential.samples()
    }
}

impl Default for Schrodinger {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Schrodinger {
    fn name(&self) -> &'static str {
        "schrodinger"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.potential.bind(grid)?;
        self.dxx = Some(filtered_laplacian(grid)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let dxx = bound(&mut self.dxx)?;
        let potential = self.potential.samples();
        SpectralError::check_len("Field", potential.len(), u.len())?;
        let u_xx = dxx.apply(u)?;
        Ok(u
            .iter()
            .zip(&u_xx)
            .zip(potential)
            .map(|((&v, &v_xx), &potential)| MINUS_I * (-0.5 * v_xx + potential * v))
            .collect())
    }
}

/// Cubic nonlinear Schrödinger equation `i·u_t = −½·u_xx + κ·|u|²·u`.
/// `κ` defaults to zero, which reduces to the free Schrödinger equation.
pub struct Nls {
    focusing: f64,
    dxx: Option<FilteredDerivativeOperator>,
}

impl Nls {
    pub fn new() -> Self {
        Self {
            focusing: 0.0,
            dxx: None,
        }
    }

    pub fn with_focusing(mut self, kappa: f64) -> Self {
        self.focusing = kappa;
        self
    }

    pub fn set_focusing(&mut self, kappa: f64) {
        self.focusing = kappa;
    }

    pub fn focusing(&self) -> f64 {
        self.focusing
    }
}

impl Default for Nls {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Nls {
    fn name(&self) -> &'static str {
        "nls"
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.dxx = Some(filtered_laplacian(grid)?);
        Ok(())
    }

    fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
        let kappa = self.focusing;
        let u_xx = bound(&mut self.dxx)?.apply(u)?;
        Ok(u
            .iter()
            .zip(&u_xx)
            .map(|(&v, &v_xx)| MINUS_I * (-0.5 * v_xx + kappa * v.norm_sqr() * v))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Nls, Schrodinger};
    use crate::error::{Prerequisite, SpectralError};
    use crate::grid::Grid;
    use crate::models::Model;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    #[test]
    fn free_plane_wave_rotates_phase() {
        let grid = Grid::new(-PI, PI, 64).expect("grid");
        let mut model = Schrodinger::new();
        model.bind(&grid).expect("bind");
        assert!(model.potential().iter().all(|&v| v == 0.0));

        let u = grid.sample(|x| Complex64::new(0.0, x).exp());
        let du = model.ddt(&u, 0.0).expect("ddt");
        // −i·(½·u) for k = 1.
        for (d, v) in du.iter().zip(&u) {
            assert!((d - Complex64::new(0.0, -0.5) * v).norm() < 1e-8);
        }
    }

    #[test]
    fn potential_adds_phase_rotation() {
        let grid = Grid::new(-PI, PI, 32).expect("grid");
        let mut model = Schrodinger::new().with_potential(|_| 2.0);
        model.bind(&grid).expect("bind");
        let u = vec![Complex64::new(1.0, 0.0); 32];
        let du = model.ddt(&u, 0.0).expect("ddt");
        for d in du {
            assert!((d - Complex64::new(0.0, -2.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn nls_nonlinearity_scales_with_intensity() {
        let grid = Grid::new(-PI, PI, 32).expect("grid");
        let mut model = Nls::new();
        assert_eq!(model.focusing(), 0.0);
        model.set_focusing(-1.0);
        model.bind(&grid).expect("bind");

        let u = vec![Complex64::new(2.0, 0.0); 32];
        let du = model.ddt(&u, 0.0).expect("ddt");
        // −i·κ·|u|²·u = −i·(−1)·4·2
        for d in du {
            assert!((d - Complex64::new(0.0, 8.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn potential_and_field_lengths_are_checked() {
        let u = vec![Complex64::new(1.0, 0.0); 8];
        assert_eq!(
            Schrodinger::new().ddt(&u, 0.0).expect_err("unbound"),
            SpectralError::StateNotDefined(Prerequisite::Space)
        );

        let grid = Grid::new(-PI, PI, 16).expect("grid");
        let mut model = Schrodinger::new();
        model.bind(&grid).expect("bind");
        assert!(matches!(
            model.ddt(&u, 0.0),
            Err(SpectralError::DimensionMismatch { what: "Field", expected: 16, actual: 8 })
        ));
    }
}
