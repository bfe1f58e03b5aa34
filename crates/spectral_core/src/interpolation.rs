//! Cubic spline interpolation used to resample solver output onto the
//! requested time grid.
//!
//! The spline is C² with not-a-knot end conditions. With three knots it
//! degenerates to the interpolating parabola, with two to a line and with one
//! to a constant. Evaluation outside the knot range extends the first or last
//! polynomial piece.

use crate::error::{Result, SpectralError};

/// Knot positions plus the factorised slope system, shared by every
/// component interpolated over the same knots.
#[derive(Debug, Clone)]
pub struct SplineKnots {
    knots: Vec<f64>,
    widths: Vec<f64>,
    // Thomas factorisation of the reduced slope system over knots 1..n-1.
    lower: Vec<f64>,
    pivots: Vec<f64>,
    upper_ratios: Vec<f64>,
}

impl SplineKnots {
    pub fn new(knots: Vec<f64>) -> Result<Self> {
        if knots.is_empty() {
            return Err(SpectralError::invalid_grid(
                "Interpolation needs at least one knot.",
            ));
        }
        if knots.iter().any(|k| !k.is_finite()) {
            return Err(SpectralError::invalid_grid(
                "Interpolation knots must be finite.",
            ));
        }
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SpectralError::invalid_grid(
                "Interpolation knots must be strictly increasing.",
            ));
        }

        let widths: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let n = knots.len();
        let mut lower = Vec::new();
        let mut pivots = Vec::new();
        let mut upper_ratios = Vec::new();

        if n >= 4 {
            // Unknowns are the slopes at knots 1..=n-2. Row i couples
            // s[i-1], s[i], s[i+1]; the not-a-knot rows have been folded into
            // the first and last rows.
            let m = n - 2;
            for row in 0..m {
                let i = row + 1;
                let sub = if row == 0 { 0.0 } else { widths[i] };
                let diag = if row == 0 {
                    widths[0] + widths[1]
                } else if row == m - 1 {
                    widths[n - 3] + widths[n - 2]
                } else {
                    2.0 * (widths[i - 1] + widths[i])
                };
                let sup = if row == m - 1 { 0.0 } else { widths[i - 1] };

                let pivot = if row == 0 {
                    diag
                } else {
                    diag - sub * upper_ratios[row - 1]
                };
                lower.push(sub);
                pivots.push(pivot);
                upper_ratios.push(sup / pivot);
            }
        }

        Ok(Self {
            knots,
            widths,
            lower,
            pivots,
            upper_ratios,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Fits a spline through `values`, one per knot.
    pub fn fit(&self, values: &[f64]) -> Result<CubicSpline<'_>> {
        SpectralError::check_len("Spline values", self.knots.len(), values.len())?;
        let slopes = self.slopes(values);
        let coefficients = (0..self.widths.len())
            .map(|i| {
                let h = self.widths[i];
                let secant = (values[i + 1] - values[i]) / h;
                let t = (slopes[i] + slopes[i + 1] - 2.0 * secant) / h;
                [t / h, (secant - slopes[i]) / h - t, slopes[i], values[i]]
            })
            .collect();
        Ok(CubicSpline {
            knots: self,
            coefficients,
            constant: values[0],
        })
    }

    fn slopes(&self, y: &[f64]) -> Vec<f64> {
        let n = self.knots.len();
        let h = &self.widths;
        match n {
            1 => vec![0.0],
            2 => {
                let secant = (y[1] - y[0]) / h[0];
                vec![secant, secant]
            }
            3 => {
                let s0 = (y[1] - y[0]) / h[0];
                let s1 = (y[2] - y[1]) / h[1];
                let curvature = (s1 - s0) / (h[0] + h[1]);
                let x = &self.knots;
                x.iter()
                    .map(|&xi| s0 + curvature * (2.0 * xi - x[0] - x[1]))
                    .collect()
            }
            _ => self.not_a_knot_slopes(y),
        }
    }

    fn not_a_knot_slopes(&self, y: &[f64]) -> Vec<f64> {
        let n = self.knots.len();
        let h = &self.widths;
        let secant: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        let d_start = h[0] + h[1];
        let b_start =
            ((h[0] + 2.0 * d_start) * h[1] * secant[0] + h[0] * h[0] * secant[1]) / d_start;
        let d_end = h[n - 3] + h[n - 2];
        let b_end = (h[n - 2] * h[n - 2] * secant[n - 3]
            + (2.0 * d_end + h[n - 2]) * h[n - 3] * secant[n - 2])
            / d_end;

        let m = n - 2;
        let mut rhs: Vec<f64> = (0..m)
            .map(|row| {
                let i = row + 1;
                3.0 * (h[i] * secant[i - 1] + h[i - 1] * secant[i])
            })
            .collect();
        rhs[0] -= b_start;
        rhs[m - 1] -= b_end;

        // Forward sweep then back substitution.
        for row in 0..m {
            let previous = if row == 0 { 0.0 } else { rhs[row - 1] };
            rhs[row] = (rhs[row] - self.lower[row] * previous) / self.pivots[row];
        }
        for row in (0..m.saturating_sub(1)).rev() {
            rhs[row] -= self.upper_ratios[row] * rhs[row + 1];
        }

        let mut slopes = vec![0.0; n];
        slopes[1..n - 1].copy_from_slice(&rhs);
        slopes[0] = (b_start - d_start * slopes[1]) / h[1];
        slopes[n - 1] = (b_end - d_end * slopes[n - 2]) / h[n - 3];
        slopes
    }
}

/// Piecewise cubic `c0·s³ + c1·s² + c2·s + c3` with `s = t − knot[i]`.
#[derive(Debug, Clone)]
pub struct CubicSpline<'k> {
    knots: &'k SplineKnots,
    coefficients: Vec<[f64; 4]>,
    constant: f64,
}

impl CubicSpline<'_> {
    pub fn evaluate(&self, t: f64) -> f64 {
        if self.coefficients.is_empty() {
            return self.constant;
        }
        let knots = &self.knots.knots;
        let last = self.coefficients.len() - 1;
        let piece = knots.partition_point(|&k| k <= t).saturating_sub(1).min(last);
        let s = t - knots[piece];
        let [c0, c1, c2, c3] = self.coefficients[piece];
        ((c0 * s + c1) * s + c2) * s + c3
    }

    pub fn evaluate_many(&self, targets: &[f64]) -> Vec<f64> {
        targets.iter().map(|&t| self.evaluate(t)).collect()
    }
}
