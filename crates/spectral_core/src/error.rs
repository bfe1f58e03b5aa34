//! Error types shared by the operators, solvers and simulation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type used throughout `spectral_core`.
pub type Result<T> = std::result::Result<T, SpectralError>;

/// A configuration step that must happen before another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prerequisite {
    Space,
    Time,
    InitialCondition,
}

impl Prerequisite {
    /// The method that satisfies this prerequisite.
    pub fn definer(self) -> &'static str {
        match self {
            Prerequisite::Space => "define_space",
            Prerequisite::Time => "define_time",
            Prerequisite::InitialCondition => "define_initial_condition",
        }
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Prerequisite::Space => "Space",
            Prerequisite::Time => "Time",
            Prerequisite::InitialCondition => "Initial condition",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectralError {
    /// A configuration step was skipped.
    #[error("{} not defined. Call {} first.", .0, .0.definer())]
    StateNotDefined(Prerequisite),

    /// Degenerate spatial or temporal grid, or a filter that cannot be built on it.
    #[error("Invalid grid: {reason}")]
    InvalidGrid { reason: String },

    /// The ODE solver could not complete the requested span.
    #[error("Integration failed: {reason}")]
    Integration { reason: String },

    #[error("{what} length mismatch. Expected {expected}, got {actual}.")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SpectralError {
    pub fn invalid_grid(reason: impl Into<String>) -> Self {
        SpectralError::InvalidGrid {
            reason: reason.into(),
        }
    }

    pub fn integration(reason: impl Into<String>) -> Self {
        SpectralError::Integration {
            reason: reason.into(),
        }
    }

    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(SpectralError::DimensionMismatch {
                what,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
