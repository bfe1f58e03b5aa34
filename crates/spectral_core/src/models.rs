//! Equation right-hand sides built from spectral operators.
//!
//! A model only says how to compute `du/dt`; grids, integration and
//! resampling are handled by [`crate::simulation::Simulation`]. Adding a new
//! equation means implementing [`Model`] on top of the operator vocabulary in
//! [`crate::operators`].

mod diffusive;
mod quantum;
mod transport;

pub use diffusive::{Diffusion, Heat};
pub use quantum::{Nls, Schrodinger};
pub use transport::{Burgers, HilbertEquation, KdV, OneWayWave};

use crate::error::{Prerequisite, Result, SpectralError};
use crate::grid::Grid;
use num_complex::Complex64;

pub trait Model {
    fn name(&self) -> &'static str;

    /// Allocates operators for the grid spacing and samples parameter
    /// fields. Called every time the spatial grid is (re)defined.
    fn bind(&mut self, grid: &Grid) -> Result<()>;

    /// Returns `du/dt` at time `t`, with the same length as `u`.
    fn ddt(&mut self, u: &[Complex64], t: f64) -> Result<Vec<Complex64>>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        (**self).bind(grid)
    }

    fn ddt(&mut self, u: &[Complex64], t: f64) -> Result<Vec<Complex64>> {
        (**self).ddt(u, t)
    }
}

/// Operators only exist once the grid spacing is known.
pub(crate) fn bound<T>(slot: &mut Option<T>) -> Result<&mut T> {
    slot.as_mut()
        .ok_or(SpectralError::StateNotDefined(Prerequisite::Space))
}

enum FieldSource {
    Function(Box<dyn Fn(f64) -> f64>),
    Samples(Vec<f64>),
}

/// A spatially varying coefficient, given either as a function of `x` or as
/// samples on the grid. Functions are sampled whenever the grid changes.
pub struct ParameterField {
    source: FieldSource,
    coordinates: Option<Vec<f64>>,
    samples: Vec<f64>,
}

impl ParameterField {
    pub fn constant(value: f64) -> Self {
        Self::from_fn(move |_| value)
    }

    pub fn from_fn(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Self {
            source: FieldSource::Function(Box::new(f)),
            coordinates: None,
            samples: Vec::new(),
        }
    }

    pub fn set_fn(&mut self, f: impl Fn(f64) -> f64 + 'static) {
        self.source = FieldSource::Function(Box::new(f));
        self.refresh_function();
    }

    /// Uses `samples` verbatim. Once bound, their count must match the grid.
    pub fn set_samples(&mut self, samples: Vec<f64>) -> Result<()> {
        if let Some(coordinates) = &self.coordinates {
            SpectralError::check_len("Parameter samples", coordinates.len(), samples.len())?;
            self.samples = samples.clone();
        }
        self.source = FieldSource::Samples(samples);
        Ok(())
    }

    pub fn bind(&mut self, grid: &Grid) -> Result<()> {
        if let FieldSource::Samples(samples) = &self.source {
            SpectralError::check_len("Parameter samples", grid.len(), samples.len())?;
            self.samples = samples.clone();
        }
        self.coordinates = Some(grid.coordinates().to_vec());
        self.refresh_function();
        Ok(())
    }

    fn refresh_function(&mut self) {
        if let (FieldSource::Function(f), Some(coordinates)) = (&self.source, &self.coordinates) {
            self.samples = coordinates.iter().map(|&x| f(x)).collect();
        }
    }

    /// Values on the bound grid; empty before binding.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}
