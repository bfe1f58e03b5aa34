/// The `spectral_core` crate evolves one-dimensional periodic fields with
/// Fourier pseudo-spectral operators.
///
/// Key components:
/// - **Operators**: `SpectralOperator` applies a Fourier multiplier (derivative,
///   filtered derivative, Hilbert transform, translation) and caches the
///   multiplier and FFT plans per grid size.
/// - **Models**: right-hand sides `du/dt` built from operators (one-way wave,
///   heat, diffusion, Schrödinger, NLS, Burgers, KdV, Hilbert).
/// - **Simulation**: grid/time/initial-condition setup, adaptive integration of
///   the complex field as a real system, and cubic resampling onto the output times.
/// - **Solvers**: Dormand-Prince 5(4) with error control and fixed-step RK4.
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod models;
pub mod operators;
pub mod simulation;
pub mod solvers;
pub mod traits;

pub use error::{Prerequisite, Result, SpectralError};
pub use grid::{Grid, TimeGrid};
pub use models::Model;
pub use operators::SpectralOperator;
pub use simulation::{Simulation, SimulationResult};
pub use solvers::{IntegrationStats, SolverMethod, SolverSettings};
