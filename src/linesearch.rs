//! Line search along the current descent direction.
//!
//! The driver measures the functional at a handful of step sizes and we
//! estimate the minimizing step from a cubic model through the probes.

use crate::consts::PREC_TOL;
use crate::error::GaugeFixError;
use crate::spline::{cubic_min, spline_derivative};

/// Step size minimizing the cubic model of the probed functional values.
///
/// `alphas` and `functional` are the probed step sizes (strictly
/// ascending, starting at 0) and the functional values measured there.
/// Degenerate probe sets fall back to safe steps: a flat functional
/// yields `default_alpha`, a functional that only grows yields 0, and a
/// functional still falling at the last probe yields the last probe.
pub fn approx_minimum(
    alphas: &[f64],
    functional: &[f64],
    default_alpha: f64,
) -> Result<f64, GaugeFixError> {
    let d = spline_derivative(alphas, functional)?;
    log::trace!("line search probes alpha {:?} f {:?} df {:?}", alphas, functional, d);

    let sumder: f64 = d.iter().map(|v| v.abs()).sum();
    if sumder < PREC_TOL {
        // flat to machine precision, take the nominal step
        return Ok(default_alpha);
    }

    let negative = d.iter().filter(|&&v| v < 0.0).count();
    if negative == 0 {
        // uphill everywhere, do not move
        return Ok(0.0);
    }
    if negative == d.len() {
        // still descending at the widest probe
        return Ok(alphas[alphas.len() - 1]);
    }

    // mixed signs guarantee a sign change; the first such interval
    // brackets the stationary point of the cubic model
    let bracket = d
        .windows(2)
        .position(|w| w[0] * w[1] <= 0.0)
        .unwrap_or(0);
    let best = cubic_min(alphas, functional, &d, bracket);
    if best.is_finite() {
        Ok(best)
    } else {
        Ok(0.0)
    }
}
