//! The simulation engine: configures space, time and initial data, evolves a
//! model's right-hand side with an ODE solver and reports the trajectory on
//! the requested output times.

use crate::error::{Prerequisite, Result, SpectralError};
use crate::grid::{Grid, TimeGrid};
use crate::interpolation::SplineKnots;
use crate::models::Model;
use crate::solvers::{integrate, IntegrationStats, SolverSettings};
use crate::traits::DynamicalSystem;
use num_complex::Complex64;
use serde::Serialize;

/// Field values on the output time grid, one row per output time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub times: Vec<f64>,
    pub x: Vec<f64>,
    pub values: Vec<Vec<Complex64>>,
    pub stats: IntegrationStats,
}

impl SimulationResult {
    /// `(time samples, space samples)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.times.len(), self.x.len())
    }

    pub fn row(&self, index: usize) -> Option<&[Complex64]> {
        self.values.get(index).map(Vec::as_slice)
    }

    pub fn final_state(&self) -> Option<&[Complex64]> {
        self.values.last().map(Vec::as_slice)
    }

    pub fn real_parts(&self) -> Vec<Vec<f64>> {
        self.values
            .iter()
            .map(|row| row.iter().map(|v| v.re).collect())
            .collect()
    }

    pub fn imag_parts(&self) -> Vec<Vec<f64>> {
        self.values
            .iter()
            .map(|row| row.iter().map(|v| v.im).collect())
            .collect()
    }
}

/// Presents a complex model as a real system of twice the size:
/// `[Re u, Im u]`.
struct RealSplit<'a, M: Model> {
    model: &'a mut M,
    field: Vec<Complex64>,
}

impl<'a, M: Model> RealSplit<'a, M> {
    fn new(model: &'a mut M, len: usize) -> Self {
        Self {
            model,
            field: vec![Complex64::new(0.0, 0.0); len],
        }
    }
}

impl<M: Model> DynamicalSystem<f64> for RealSplit<'_, M> {
    fn dimension(&self) -> usize {
        2 * self.field.len()
    }

    fn apply(&mut self, t: f64, x: &[f64], out: &mut [f64]) -> Result<()> {
        let n = self.field.len();
        let (re, im) = x.split_at(n);
        for (value, (&a, &b)) in self.field.iter_mut().zip(re.iter().zip(im)) {
            *value = Complex64::new(a, b);
        }

        let du = self.model.ddt(&self.field, t)?;
        SpectralError::check_len("Model derivative", n, du.len())?;

        let (out_re, out_im) = out.split_at_mut(n);
        for (i, d) in du.iter().enumerate() {
            out_re[i] = d.re;
            out_im[i] = d.im;
        }
        Ok(())
    }
}

/// Evolves a periodic field under `M`'s right-hand side.
///
/// Configuration must happen in order: [`define_space`](Self::define_space),
/// [`define_time`](Self::define_time), then the initial condition.
pub struct Simulation<M: Model> {
    model: M,
    grid: Option<Grid>,
    time: Option<TimeGrid>,
    initial: Option<Vec<Complex64>>,
    settings: SolverSettings,
}

impl<M: Model> Simulation<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            grid: None,
            time: None,
            initial: None,
            settings: SolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn time_grid(&self) -> Option<&TimeGrid> {
        self.time.as_ref()
    }

    pub fn initial_condition(&self) -> Option<&[Complex64]> {
        self.initial.as_deref()
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn set_solver_settings(&mut self, settings: SolverSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Samples `[a, b)` with `n` points and binds the model to the new
    /// spacing. Any previous initial condition is discarded.
    pub fn define_space(&mut self, a: f64, b: f64, n: usize) -> Result<&Grid> {
        let grid = Grid::new(a, b, n)?;
        self.model.bind(&grid)?;
        log::debug!(
            "{}: space [{a}, {b}) with {n} samples, dx = {}",
            self.model.name(),
            grid.dx()
        );
        self.initial = None;
        Ok(self.grid.insert(grid))
    }

    pub fn define_time(&mut self, t0: f64, t1: f64, samples: usize) -> Result<&TimeGrid> {
        self.require(Prerequisite::Space)?;
        let time = TimeGrid::new(t0, t1, samples)?;
        Ok(self.time.insert(time))
    }

    /// Evaluates `f` on the spatial grid and stores it as the initial field.
    pub fn define_initial_condition<F, V>(&mut self, f: F) -> Result<()>
    where
        F: Fn(f64) -> V,
        V: Into<Complex64>,
    {
        let grid = self.require_grid()?;
        self.require(Prerequisite::Time)?;
        let field = grid.sample(f);
        self.initial = Some(field);
        Ok(())
    }

    /// Uses pre-sampled initial data; its length must match the grid.
    pub fn define_initial_state(&mut self, state: Vec<Complex64>) -> Result<()> {
        let expected = self.require_grid()?.len();
        self.require(Prerequisite::Time)?;
        SpectralError::check_len("Initial state", expected, state.len())?;
        self.initial = Some(state);
        Ok(())
    }

    /// Integrates from the first to the last output time and resamples the
    /// solver trajectory onto the output grid.
    pub fn integrate(&mut self) -> Result<SimulationResult> {
        self.require(Prerequisite::Space)?;
        self.require(Prerequisite::Time)?;
        self.require(Prerequisite::InitialCondition)?;
        let (Some(grid), Some(time), Some(initial)) = (&self.grid, &self.time, &self.initial)
        else {
            return Err(SpectralError::StateNotDefined(Prerequisite::Space));
        };

        let n = grid.len();
        if initial.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(SpectralError::integration(
                "Initial condition contains non-finite values.",
            ));
        }
        let y0: Vec<f64> = initial
            .iter()
            .map(|v| v.re)
            .chain(initial.iter().map(|v| v.im))
            .collect();

        let mut system = RealSplit::new(&mut self.model, n);
        let trajectory = integrate(
            &mut system,
            (time.start(), time.end()),
            &y0,
            &self.settings,
        )?;

        let targets = time.times();
        let first = trajectory.times[0];
        let last = trajectory.times[trajectory.times.len() - 1];
        if targets.iter().any(|&t| t < first || t > last) {
            log::warn!(
                "output times extend beyond the solver range [{first}, {last}]; extrapolating"
            );
        }

        let knots = SplineKnots::new(trajectory.times.clone())?;
        let mut values = vec![vec![Complex64::new(0.0, 0.0); n]; targets.len()];
        for i in 0..n {
            let re = knots.fit(&trajectory.component(i))?.evaluate_many(targets);
            let im = knots.fit(&trajectory.component(n + i))?.evaluate_many(targets);
            for (row, (a, b)) in values.iter_mut().zip(re.into_iter().zip(im)) {
                row[i] = Complex64::new(a, b);
            }
        }

        Ok(SimulationResult {
            times: targets.to_vec(),
            x: grid.coordinates().to_vec(),
            values,
            stats: trajectory.stats,
        })
    }

    fn require(&self, step: Prerequisite) -> Result<()> {
        let present = match step {
            Prerequisite::Space => self.grid.is_some(),
            Prerequisite::Time => self.time.is_some(),
            Prerequisite::InitialCondition => self.initial.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(SpectralError::StateNotDefined(step))
        }
    }

    fn require_grid(&self) -> Result<&Grid> {
        self.grid
            .as_ref()
            .ok_or(SpectralError::StateNotDefined(Prerequisite::Space))
    }
}

#[cfg(test)]
mod tests {
    use super::Simulation;
    use crate::error::{Prerequisite, Result, SpectralError};
    use crate::grid::Grid;
    use crate::models::{HilbertEquation, Model, OneWayWave};
    use crate::solvers::{SolverMethod, SolverSettings};
    use num_complex::Complex64;
    use std::f64::consts::PI;

    /// u_t = λ·u with a complex rate, solved exactly by exp(λt)·u0.
    struct Rotation {
        rate: Complex64,
    }

    impl Model for Rotation {
        fn name(&self) -> &'static str {
            "rotation"
        }

        fn bind(&mut self, _grid: &Grid) -> Result<()> {
            Ok(())
        }

        fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
            Ok(u.iter().map(|v| self.rate * v).collect())
        }
    }

    struct Truncating;

    impl Model for Truncating {
        fn name(&self) -> &'static str {
            "truncating"
        }

        fn bind(&mut self, _grid: &Grid) -> Result<()> {
            Ok(())
        }

        fn ddt(&mut self, u: &[Complex64], _t: f64) -> Result<Vec<Complex64>> {
            Ok(u[1..].to_vec())
        }
    }

    #[test]
    fn configuration_order_is_enforced() {
        let mut sim = Simulation::new(OneWayWave::new());
        assert_eq!(
            sim.integrate().expect_err("nothing defined"),
            SpectralError::StateNotDefined(Prerequisite::Space)
        );
        assert_eq!(
            sim.define_time(0.0, 1.0, 4).expect_err("no space"),
            SpectralError::StateNotDefined(Prerequisite::Space)
        );
        assert_eq!(
            sim.define_initial_condition(f64::sin).expect_err("no space"),
            SpectralError::StateNotDefined(Prerequisite::Space)
        );

        sim.define_space(-PI, PI, 16).expect("space");
        assert_eq!(
            sim.define_initial_condition(f64::sin).expect_err("no time"),
            SpectralError::StateNotDefined(Prerequisite::Time)
        );
        assert_eq!(
            sim.integrate().expect_err("no time"),
            SpectralError::StateNotDefined(Prerequisite::Time)
        );

        sim.define_time(0.0, 1.0, 4).expect("time");
        assert_eq!(
            sim.integrate().expect_err("no initial condition"),
            SpectralError::StateNotDefined(Prerequisite::InitialCondition)
        );

        sim.define_initial_condition(f64::sin).expect("initial condition");
        assert!(sim.integrate().is_ok());
    }

    #[test]
    fn redefining_space_discards_initial_condition() {
        let mut sim = Simulation::new(OneWayWave::new());
        sim.define_space(0.0, 1.0, 8).expect("space");
        sim.define_time(0.0, 1.0, 2).expect("time");
        sim.define_initial_condition(|x| x).expect("initial condition");
        assert_eq!(sim.initial_condition().map(<[_]>::len), Some(8));

        sim.define_space(0.0, 1.0, 16).expect("space");
        assert!(sim.initial_condition().is_none());
        assert!(sim.time_grid().is_some());
    }

    #[test]
    fn result_shape_matches_grids() {
        for (n, m) in [(2, 1), (5, 3), (16, 7), (33, 20)] {
            let mut sim = Simulation::new(HilbertEquation::new());
            sim.define_space(0.0, 2.0 * PI, n).expect("space");
            sim.define_time(0.0, 0.5, m).expect("time");
            sim.define_initial_condition(|x| x.cos()).expect("initial condition");
            let result = sim.integrate().expect("integrate");
            assert_eq!(result.shape(), (m, n));
            assert_eq!(result.values.len(), m);
            assert!(result.values.iter().all(|row| row.len() == n));
        }
    }

    #[test]
    fn complex_state_is_recombined_correctly() {
        let rate = Complex64::new(-0.3, 2.0);
        let settings = SolverSettings {
            rtol: 1e-10,
            atol: 1e-12,
            ..SolverSettings::default()
        };
        let mut sim = Simulation::new(Rotation { rate }).with_settings(settings);
        sim.define_space(0.0, 1.0, 4).expect("space");
        sim.define_time(0.0, 2.0, 9).expect("time");
        sim.define_initial_condition(|x| Complex64::new(1.0 + x, -x))
            .expect("initial condition");
        let result = sim.integrate().expect("integrate");

        let initial = sim.initial_condition().expect("initial").to_vec();
        for (t, row) in result.times.iter().zip(&result.values) {
            let factor = (rate * t).exp();
            for (v, u0) in row.iter().zip(&initial) {
                assert!((v - factor * u0).norm() < 1e-6, "t = {t}");
            }
        }
        assert_eq!(result.row(0).expect("first row"), initial.as_slice());
    }

    #[test]
    fn fixed_step_method_uses_same_pipeline() {
        let settings = SolverSettings {
            method: SolverMethod::Rk4 { dt: 0.01 },
            ..SolverSettings::default()
        };
        let mut sim = Simulation::new(Rotation {
            rate: Complex64::new(0.0, 1.0),
        });
        sim.set_solver_settings(settings).expect("settings");
        sim.define_space(0.0, 1.0, 2).expect("space");
        sim.define_time(0.0, PI, 5).expect("time");
        sim.define_initial_state(vec![Complex64::new(1.0, 0.0); 2])
            .expect("initial state");
        let result = sim.integrate().expect("integrate");
        let last = result.final_state().expect("final state");
        assert!((last[0] - Complex64::new(-1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn initial_state_length_is_checked() {
        let mut sim = Simulation::new(OneWayWave::new());
        sim.define_space(0.0, 1.0, 8).expect("space");
        sim.define_time(0.0, 1.0, 2).expect("time");
        assert!(matches!(
            sim.define_initial_state(vec![Complex64::new(0.0, 0.0); 3]),
            Err(SpectralError::DimensionMismatch { expected: 8, actual: 3, .. })
        ));
    }

    #[test]
    fn wrong_derivative_length_is_an_error() {
        let mut sim = Simulation::new(Truncating);
        sim.define_space(0.0, 1.0, 4).expect("space");
        sim.define_time(0.0, 1.0, 2).expect("time");
        sim.define_initial_condition(|_| 1.0).expect("initial condition");
        assert!(matches!(
            sim.integrate(),
            Err(SpectralError::DimensionMismatch { what: "Model derivative", .. })
        ));
    }

    #[test]
    fn single_output_time_returns_initial_condition() {
        let mut sim = Simulation::new(OneWayWave::new());
        sim.define_space(-PI, PI, 8).expect("space");
        sim.define_time(1.0, 1.0, 1).expect("time");
        sim.define_initial_condition(f64::cos).expect("initial condition");
        let result = sim.integrate().expect("integrate");
        assert_eq!(result.shape(), (1, 8));
        assert_eq!(
            result.row(0).expect("row"),
            sim.initial_condition().expect("initial")
        );
    }
}
