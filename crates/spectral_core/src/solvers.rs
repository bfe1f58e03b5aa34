use crate::error::{Result, SpectralError};
use crate::traits::{DynamicalSystem, Scalar, Steppable};
use serde::{Deserialize, Serialize};

/// Classic Runge-Kutta 4th Order Solver
pub struct Rk4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Rk4<T> {
    fn step(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        let half = scalar::<T>(0.5);
        let sixth = scalar::<T>(1.0 / 6.0);
        let two = scalar::<T>(2.0);

        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1)?;

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2)?;

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3)?;

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4)?;

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
        Ok(())
    }
}

/// Dormand-Prince 5(4) stepper with an embedded 4th order error estimate.
///
/// The last stage is evaluated at the new state, so after an accepted step
/// it doubles as the first stage of the next one.
pub struct DormandPrince45<T: Scalar> {
    k: [Vec<T>; 7],
    tmp: Vec<T>,
    proposal: Vec<T>,
}

impl<T: Scalar> DormandPrince45<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![T::zero(); dim]),
            tmp: vec![T::zero(); dim],
            proposal: vec![T::zero(); dim],
        }
    }

    /// Stores `f(t, state)` as the first stage.
    pub fn prime(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: T,
        state: &[T],
    ) -> Result<()> {
        system.apply(t, state, &mut self.k[0])
    }

    /// Most recent first-stage derivative.
    pub fn derivative(&self) -> &[T] {
        &self.k[0]
    }

    /// Computes a trial step of size `dt` from `(t, state)` without
    /// committing it and returns the scaled RMS error norm. A norm at or
    /// below one is acceptable.
    pub fn attempt(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        rtol: T,
        atol: T,
    ) -> Result<T> {
        self.prime(system, t, state)?;
        self.attempt_primed(system, t, state, dt, rtol, atol)
    }

    /// Like [`attempt`](Self::attempt), but trusts the stored first stage to
    /// equal `f(t, state)`. Holds after `prime` and after every `accept`.
    pub(crate) fn attempt_primed(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        rtol: T,
        atol: T,
    ) -> Result<T> {
        let c = dp_nodes::<T>();
        let a = dp_tableau::<T>();
        let e = dp_error_weights::<T>();

        for stage in 1..7 {
            for i in 0..state.len() {
                let mut acc = T::zero();
                for (j, &coeff) in a[stage].iter().enumerate().take(stage) {
                    acc = acc + coeff * self.k[j][i];
                }
                self.tmp[i] = state[i] + dt * acc;
            }
            if stage == 6 {
                self.proposal.copy_from_slice(&self.tmp);
            }
            system.apply(t + c[stage] * dt, &self.tmp, &mut self.k[stage])?;
        }

        let mut sum = T::zero();
        for i in 0..state.len() {
            let mut err = T::zero();
            for (j, &weight) in e.iter().enumerate() {
                err = err + weight * self.k[j][i];
            }
            err = err * dt;
            let scale = atol + state[i].abs().max(self.proposal[i].abs()) * rtol;
            let ratio = err / scale;
            sum = sum + ratio * ratio;
        }
        let dim = T::from_usize(state.len().max(1)).unwrap_or_else(T::one);
        Ok((sum / dim).sqrt())
    }

    /// Commits the last attempt: copies the proposed state and promotes the
    /// final stage to the first stage of the next step.
    pub fn accept(&mut self, state: &mut [T]) {
        state.copy_from_slice(&self.proposal);
        self.k.swap(0, 6);
    }
}

impl<T: Scalar> Steppable<T> for DormandPrince45<T> {
    /// Fixed step without error control.
    fn step(
        &mut self,
        system: &mut impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        self.attempt(system, *t, state, dt, T::one(), T::one())?;
        self.accept(state);
        *t = *t + dt;
        Ok(())
    }
}

fn scalar<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

fn dp_nodes<T: Scalar>() -> [T; 7] {
    [0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0].map(scalar)
}

fn dp_tableau<T: Scalar>() -> [[T; 6]; 7] {
    [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
        [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
        [
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
            0.0,
            0.0,
        ],
        [
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
            0.0,
        ],
        // 5th order weights; the stage built from them is the new state.
        [
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ]
    .map(|row| row.map(scalar))
}

/// Difference between the 5th and embedded 4th order weights.
fn dp_error_weights<T: Scalar>() -> [T; 7] {
    [
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ]
    .map(scalar)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolverMethod {
    /// Adaptive Dormand-Prince 5(4) with error control.
    DormandPrince45,
    /// Fixed step RK4; the last step is shortened to land on the end time.
    Rk4 { dt: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    pub method: SolverMethod,
    pub rtol: f64,
    pub atol: f64,
    /// Upper bound on attempted steps, accepted or rejected.
    pub max_steps: usize,
    pub first_step: Option<f64>,
    pub max_step: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            method: SolverMethod::DormandPrince45,
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 500_000,
            first_step: None,
            max_step: f64::INFINITY,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.rtol > 0.0) {
            return Err(SpectralError::integration("rtol must be positive."));
        }
        if !(self.atol >= 0.0) {
            return Err(SpectralError::integration("atol must be non-negative."));
        }
        if self.max_steps == 0 {
            return Err(SpectralError::integration(
                "max_steps must be greater than zero.",
            ));
        }
        if !(self.max_step > 0.0) {
            return Err(SpectralError::integration("max_step must be positive."));
        }
        if let Some(first) = self.first_step {
            if !(first > 0.0 && first.is_finite()) {
                return Err(SpectralError::integration(
                    "first_step must be positive and finite.",
                ));
            }
        }
        if let SolverMethod::Rk4 { dt } = self.method {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(SpectralError::integration(
                    "RK4 step size dt must be positive and finite.",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
}

/// States at every accepted step, starting with the initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub stats: IntegrationStats,
}

impl Trajectory {
    /// Values of one state component over all recorded times.
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|state| state[index]).collect()
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

/// Counts right-hand side evaluations on behalf of the driver.
struct Counted<'a, S> {
    inner: &'a mut S,
    evaluations: usize,
}

impl<S: DynamicalSystem<f64>> DynamicalSystem<f64> for Counted<'_, S> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn apply(&mut self, t: f64, x: &[f64], out: &mut [f64]) -> Result<()> {
        self.evaluations += 1;
        self.inner.apply(t, x, out)
    }
}

/// Integrates `system` from `t_span.0` to `t_span.1`, recording every
/// accepted step.
pub fn integrate<S: DynamicalSystem<f64>>(
    system: &mut S,
    t_span: (f64, f64),
    y0: &[f64],
    settings: &SolverSettings,
) -> Result<Trajectory> {
    settings.validate()?;
    let (t0, t1) = t_span;
    if !(t0.is_finite() && t1.is_finite()) || t1 < t0 {
        return Err(SpectralError::integration(format!(
            "Invalid time span [{t0}, {t1}]."
        )));
    }
    SpectralError::check_len("Initial state", system.dimension(), y0.len())?;
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(SpectralError::integration(
            "Initial state contains non-finite values.",
        ));
    }

    let mut counted = Counted {
        inner: system,
        evaluations: 0,
    };
    let mut trajectory = Trajectory {
        times: vec![t0],
        states: vec![y0.to_vec()],
        stats: IntegrationStats::default(),
    };
    if t1 == t0 {
        return Ok(trajectory);
    }

    match settings.method {
        SolverMethod::DormandPrince45 => {
            run_adaptive(&mut counted, t0, t1, y0, settings, &mut trajectory)?
        }
        SolverMethod::Rk4 { dt } => {
            run_fixed(&mut counted, t0, t1, y0, dt, settings, &mut trajectory)?
        }
    }

    trajectory.stats.rhs_evaluations = counted.evaluations;
    log::info!(
        "integrated [{t0}, {t1}]: {} accepted, {} rejected steps, {} RHS evaluations",
        trajectory.stats.accepted_steps,
        trajectory.stats.rejected_steps,
        trajectory.stats.rhs_evaluations
    );
    Ok(trajectory)
}

fn run_fixed<S: DynamicalSystem<f64>>(
    system: &mut S,
    t0: f64,
    t1: f64,
    y0: &[f64],
    dt: f64,
    settings: &SolverSettings,
    trajectory: &mut Trajectory,
) -> Result<()> {
    let mut stepper = Rk4::new(y0.len());
    let mut state = y0.to_vec();
    let mut t = t0;
    let dt = dt.min(settings.max_step);

    while t < t1 {
        if trajectory.stats.accepted_steps >= settings.max_steps {
            return Err(SpectralError::integration(format!(
                "Exceeded {} steps before reaching t = {t1} (stopped at t = {t}).",
                settings.max_steps
            )));
        }
        let mut h = dt.min(t1 - t);
        // Avoid a sliver of a final step.
        if t1 - (t + h) <= 1e-12 * t1.abs().max(1.0) {
            h = t1 - t;
        }
        stepper.step(system, &mut t, &mut state, h)?;
        if (t1 - t).abs() <= f64::EPSILON * t1.abs().max(1.0) {
            t = t1;
        }
        ensure_finite(&state, t)?;
        trajectory.stats.accepted_steps += 1;
        trajectory.times.push(t);
        trajectory.states.push(state.clone());
    }
    Ok(())
}

fn run_adaptive<S: DynamicalSystem<f64>>(
    system: &mut S,
    t0: f64,
    t1: f64,
    y0: &[f64],
    settings: &SolverSettings,
    trajectory: &mut Trajectory,
) -> Result<()> {
    let mut stepper = DormandPrince45::new(y0.len());
    let mut state = y0.to_vec();
    let mut t = t0;

    stepper.prime(system, t, &state)?;
    let mut h = match settings.first_step {
        Some(first) => first,
        None => initial_step(system, t0, t1, &state, stepper.derivative(), settings)?,
    }
    .min(settings.max_step);
    log::debug!("adaptive integration starts with h = {h:e}");

    let mut attempts = 0usize;
    while t < t1 {
        let min_step = 10.0 * f64::EPSILON * t.abs().max(f64::MIN_POSITIVE);
        h = h.min(settings.max_step).min(t1 - t);
        // A remainder shorter than the resolvable spacing is taken in one step.
        let sliver = t1 - t < min_step;
        if sliver {
            h = t1 - t;
        }

        let mut rejected_last = false;
        loop {
            if attempts >= settings.max_steps {
                return Err(SpectralError::integration(format!(
                    "Exceeded {} steps before reaching t = {t1} (stopped at t = {t}).",
                    settings.max_steps
                )));
            }
            if h < min_step && !sliver {
                return Err(SpectralError::integration(format!(
                    "Required step size {h:e} is below the resolvable spacing at t = {t}."
                )));
            }
            attempts += 1;

            let error_norm =
                stepper.attempt_primed(system, t, &state, h, settings.rtol, settings.atol)?;
            if error_norm.is_finite() && error_norm < 1.0 {
                let mut factor = if error_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * error_norm.powf(ERROR_EXPONENT))
                };
                if rejected_last {
                    factor = factor.min(1.0);
                }
                let t_new = if t1 - (t + h) <= f64::EPSILON * t1.abs().max(1.0) {
                    t1
                } else {
                    t + h
                };
                stepper.accept(&mut state);
                t = t_new;
                h *= factor;
                break;
            }

            let factor = if error_norm.is_finite() {
                MIN_FACTOR.max(SAFETY * error_norm.powf(ERROR_EXPONENT))
            } else {
                MIN_FACTOR
            };
            h *= factor;
            rejected_last = true;
            trajectory.stats.rejected_steps += 1;
        }

        ensure_finite(&state, t)?;
        trajectory.stats.accepted_steps += 1;
        trajectory.times.push(t);
        trajectory.states.push(state.clone());
    }
    log::debug!(
        "adaptive integration finished after {attempts} attempts, last h = {h:e}"
    );
    Ok(())
}

/// Initial step estimate from the scaled sizes of the state, its derivative
/// and a finite-difference second derivative (Hairer, Nørsett & Wanner).
fn initial_step<S: DynamicalSystem<f64>>(
    system: &mut S,
    t0: f64,
    t1: f64,
    y0: &[f64],
    f0: &[f64],
    settings: &SolverSettings,
) -> Result<f64> {
    let span = t1 - t0;
    if y0.is_empty() {
        return Ok(span);
    }
    let scale: Vec<f64> = y0
        .iter()
        .map(|y| settings.atol + y.abs() * settings.rtol)
        .collect();
    let d0 = scaled_rms(y0, &scale);
    let d1 = scaled_rms(f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
    .min(span);

    let y1: Vec<f64> = y0.iter().zip(f0).map(|(y, f)| y + h0 * f).collect();
    let mut f1 = vec![0.0; y0.len()];
    system.apply(t0 + h0, &y1, &mut f1)?;
    let diff: Vec<f64> = f1.iter().zip(f0).map(|(a, b)| a - b).collect();
    let d2 = scaled_rms(&diff, &scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / 5.0)
    };
    let h = (100.0 * h0).min(h1).min(span);
    if !(h.is_finite() && h > 0.0) {
        return Err(SpectralError::integration(format!(
            "Could not select an initial step (estimate {h})."
        )));
    }
    Ok(h)
}

fn scaled_rms(values: &[f64], scale: &[f64]) -> f64 {
    let sum: f64 = values
        .iter()
        .zip(scale)
        .map(|(v, s)| {
            let r = v / s;
            r * r
        })
        .sum();
    (sum / values.len() as f64).sqrt()
}

fn ensure_finite(state: &[f64], t: f64) -> Result<()> {
    if state.iter().any(|v| !v.is_finite()) {
        return Err(SpectralError::integration(format!(
            "State became non-finite at t = {t}."
        )));
    }
    Ok(())
}
