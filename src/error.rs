use std::fmt;

/// Error types for the gauge-fixing core.
///
/// Only precondition violations are errors. Numerical degeneracies
/// (flat functional, NaN cubic root, an all-zero derivative field) are
/// defined fallback paths that return sentinel values instead.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeFixError {
    BufferLengthMismatch { expected: usize, found: usize },
    InvalidDimension,
    InvalidParameters(String),
    InvalidProbeSet,
    InvalidSlice { slice: usize, extent: usize },
    PlanLengthMismatch { expected: usize, found: usize },
    UnorderedProbes,
}

impl fmt::Display for GaugeFixError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GaugeFixError::BufferLengthMismatch { expected, found } => {
                write!(
                    f,
                    "Buffer length mismatch: expected {}, found {}",
                    expected, found
                )
            }
            GaugeFixError::InvalidDimension => {
                write!(f, "Direction count must be ND (Landau) or ND-1 (Coulomb)")
            }
            GaugeFixError::InvalidParameters(msg) => {
                write!(f, "Invalid parameters: {}", msg)
            }
            GaugeFixError::InvalidProbeSet => {
                write!(
                    f,
                    "Probe set needs at least two equal-length alpha/functional pairs"
                )
            }
            GaugeFixError::InvalidSlice { slice, extent } => {
                write!(f, "Time slice {} outside temporal extent {}", slice, extent)
            }
            GaugeFixError::PlanLengthMismatch { expected, found } => {
                write!(
                    f,
                    "Transform plan length mismatch: expected {}, found {}",
                    expected, found
                )
            }
            GaugeFixError::UnorderedProbes => {
                write!(f, "Probe alphas must be strictly ascending")
            }
        }
    }
}

impl std::error::Error for GaugeFixError {}
