//! Periodic spatial grids, output time grids and FFT wavenumbers.

use crate::error::{Result, SpectralError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// `N` uniformly spaced samples over `[start, end)`; the right endpoint is
/// the periodic image of the left one and is not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridFields")]
pub struct Grid {
    start: f64,
    end: f64,
    dx: f64,
    coordinates: Vec<f64>,
}

impl Grid {
    pub fn new(start: f64, end: f64, len: usize) -> Result<Self> {
        if len < 2 {
            return Err(SpectralError::invalid_grid(format!(
                "Spatial grid needs at least 2 samples, got {len}."
            )));
        }
        if !start.is_finite() || !end.is_finite() {
            return Err(SpectralError::invalid_grid("Domain bounds must be finite."));
        }
        if end <= start {
            return Err(SpectralError::invalid_grid(format!(
                "Domain must satisfy a < b, got [{start}, {end})."
            )));
        }

        let dx = (end - start) / len as f64;
        let coordinates = (0..len).map(|i| start + i as f64 * dx).collect();
        Ok(Self {
            start,
            end,
            dx,
            coordinates,
        })
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.start, self.end)
    }

    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn wavenumbers(&self) -> Vec<f64> {
        wavenumbers(self.len(), self.dx)
    }

    /// Evaluates `f` at every coordinate.
    pub fn sample<F, V>(&self, f: F) -> Vec<Complex64>
    where
        F: Fn(f64) -> V,
        V: Into<Complex64>,
    {
        self.coordinates.iter().map(|&x| f(x).into()).collect()
    }
}

/// Serialized form of a [`Grid`]; only the bounds and the sample count are
/// trusted, everything else is rebuilt by [`Grid::new`].
#[derive(Deserialize)]
struct GridFields {
    start: f64,
    end: f64,
    coordinates: Vec<f64>,
}

impl TryFrom<GridFields> for Grid {
    type Error = SpectralError;

    fn try_from(fields: GridFields) -> Result<Self> {
        Grid::new(fields.start, fields.end, fields.coordinates.len())
    }
}

/// Angular wavenumbers `2π·fftfreq(n, dx)` in FFT output order:
/// `[0, 1, …, ⌈n/2⌉−1, −⌊n/2⌋, …, −1] · 2π/(n·dx)`.
pub fn wavenumbers(n: usize, dx: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let scale = 2.0 * PI / (n as f64 * dx);
    let positive = (n + 1) / 2;
    (0..n)
        .map(|i| {
            let index = if i < positive {
                i as f64
            } else {
                i as f64 - n as f64
            };
            index * scale
        })
        .collect()
}

/// Times at which a trajectory is reported, `linspace(start, end, samples)`
/// with both ends included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimeGridFields")]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    pub fn new(start: f64, end: f64, samples: usize) -> Result<Self> {
        if samples == 0 {
            return Err(SpectralError::invalid_grid(
                "Time grid needs at least 1 sample.",
            ));
        }
        if !start.is_finite() || !end.is_finite() {
            return Err(SpectralError::invalid_grid("Time bounds must be finite."));
        }
        if end < start {
            return Err(SpectralError::invalid_grid(format!(
                "Time span must run forward, got [{start}, {end}]."
            )));
        }
        if samples > 1 && end == start {
            return Err(SpectralError::invalid_grid(format!(
                "{samples} time samples requested over an empty span."
            )));
        }

        let times = if samples == 1 {
            vec![start]
        } else {
            let step = (end - start) / (samples - 1) as f64;
            let mut times: Vec<f64> = (0..samples).map(|i| start + i as f64 * step).collect();
            times[samples - 1] = end;
            times
        };
        Ok(Self { times })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.times[0]
    }

    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Spacing between output samples; zero for a single sample.
    pub fn dt(&self) -> f64 {
        if self.times.len() < 2 {
            0.0
        } else {
            self.times[1] - self.times[0]
        }
    }
}

#[derive(Deserialize)]
struct TimeGridFields {
    times: Vec<f64>,
}

impl TryFrom<TimeGridFields> for TimeGrid {
    type Error = SpectralError;

    fn try_from(fields: TimeGridFields) -> Result<Self> {
        match (fields.times.first(), fields.times.last()) {
            (Some(&start), Some(&end)) => TimeGrid::new(start, end, fields.times.len()),
            _ => Err(SpectralError::invalid_grid(
                "Time grid needs at least 1 sample.",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{wavenumbers, Grid, GridFields, TimeGrid, TimeGridFields};
    use std::f64::consts::PI;

    #[test]
    fn grid_excludes_right_endpoint() {
        let grid = Grid::new(-PI, PI, 4).expect("grid");
        assert!((grid.dx() - PI / 2.0).abs() < 1e-15);
        let expected = [-PI, -PI / 2.0, 0.0, PI / 2.0];
        for (x, e) in grid.coordinates().iter().zip(expected) {
            assert!((x - e).abs() < 1e-15);
        }
    }

    #[test]
    fn grid_rejects_degenerate_input() {
        let err = Grid::new(0.0, 1.0, 1).expect_err("single point");
        assert!(err.to_string().contains("at least 2 samples"));
        assert!(Grid::new(1.0, 1.0, 8).is_err());
        assert!(Grid::new(0.0, f64::INFINITY, 8).is_err());
    }

    #[test]
    fn wavenumbers_follow_fft_order() {
        // 2π·fftfreq(4, 0.25) = 2π·[0, 1, -2, -1]
        let k = wavenumbers(4, 0.25);
        let expected = [0.0, 1.0, -2.0, -1.0];
        for (k, e) in k.iter().zip(expected) {
            assert!((k - 2.0 * PI * e).abs() < 1e-12);
        }

        let k = wavenumbers(5, 2.0 * PI / 5.0);
        assert_eq!(k.len(), 5);
        let expected = [0.0, 1.0, 2.0, -2.0, -1.0];
        for (k, e) in k.iter().zip(expected) {
            assert!((k - e).abs() < 1e-12);
        }
    }

    #[test]
    fn time_grid_includes_both_ends() {
        let grid = TimeGrid::new(0.0, 1.0, 5).expect("time grid");
        assert_eq!(grid.times(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(grid.dt(), 0.25);

        let single = TimeGrid::new(2.0, 3.0, 1).expect("single sample");
        assert_eq!(single.times(), &[2.0]);
        assert_eq!(single.dt(), 0.0);
    }

    #[test]
    fn time_grid_rejects_backward_or_empty_span() {
        assert!(TimeGrid::new(1.0, 0.0, 4).is_err());
        assert!(TimeGrid::new(0.0, 0.0, 4).is_err());
        assert!(TimeGrid::new(0.0, 1.0, 0).is_err());
        assert!(TimeGrid::new(0.0, 0.0, 1).is_ok());
    }

    #[test]
    fn stored_grids_are_revalidated() {
        let empty = GridFields {
            start: 0.0,
            end: 1.0,
            coordinates: Vec::new(),
        };
        assert!(Grid::try_from(empty).is_err());

        let stored = GridFields {
            start: -PI,
            end: PI,
            coordinates: vec![0.0; 8],
        };
        let grid = Grid::try_from(stored).expect("grid");
        assert_eq!(grid, Grid::new(-PI, PI, 8).expect("grid"));

        assert!(TimeGrid::try_from(TimeGridFields { times: Vec::new() }).is_err());
        assert!(TimeGrid::try_from(TimeGridFields {
            times: vec![1.0, 0.0]
        })
        .is_err());
        let time = TimeGrid::try_from(TimeGridFields {
            times: vec![0.0, 0.5, 1.0],
        })
        .expect("time grid");
        assert_eq!(time, TimeGrid::new(0.0, 1.0, 3).expect("time grid"));
    }
}
