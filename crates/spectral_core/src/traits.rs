use crate::error::Result;
use num_complex::Complex64;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the time steppers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A first-order system x' = f(t, x) over a real state vector.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer to write dx/dt into
    ///
    /// Takes `&mut self` because right-hand sides built from spectral
    /// operators refresh their multiplier caches lazily.
    fn apply(&mut self, t: T, x: &[T], out: &mut [T]) -> Result<()>;
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()>;
}

/// Supplies the per-mode factor that realises a linear, translation-invariant
/// operator as a multiplication in Fourier space.
pub trait SpectralMultiplier {
    /// Returns one multiplier per entry of `wavenumbers`. Must depend only on
    /// the wavenumbers and on construction parameters.
    fn multiplier(&self, wavenumbers: &[f64]) -> Result<Vec<Complex64>>;
}
