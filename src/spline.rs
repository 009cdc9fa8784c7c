//! Cubic-spline utilities backing the line search: smooth derivative
//! estimates at the probe points and the bracketed cubic solve.

use crate::error::GaugeFixError;

/// First derivatives of the natural cubic spline through `(x, y)` at each
/// knot. `x` must be strictly ascending.
pub fn spline_derivative(x: &[f64], y: &[f64]) -> Result<Vec<f64>, GaugeFixError> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return Err(GaugeFixError::InvalidProbeSet);
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(GaugeFixError::UnorderedProbes);
    }

    if n == 2 {
        let slope = (y[1] - y[0]) / (x[1] - x[0]);
        return Ok(vec![slope; 2]);
    }

    // second derivatives at the knots, natural boundary (M_0 = M_{n-1} = 0),
    // Thomas algorithm on the interior tridiagonal system
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let mut m = vec![0.0; n];
    let interior = n - 2;
    let mut diag = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];
    for i in 0..interior {
        diag[i] = (h[i] + h[i + 1]) / 3.0;
        rhs[i] = (y[i + 2] - y[i + 1]) / h[i + 1] - (y[i + 1] - y[i]) / h[i];
    }
    for i in 1..interior {
        let w = (h[i] / 6.0) / diag[i - 1];
        diag[i] -= w * h[i] / 6.0;
        rhs[i] -= w * rhs[i - 1];
    }
    for i in (0..interior).rev() {
        let upper = if i + 1 < interior {
            h[i + 1] / 6.0 * m[i + 2]
        } else {
            0.0
        };
        m[i + 1] = (rhs[i] - upper) / diag[i];
    }

    let mut d = vec![0.0; n];
    for i in 0..n - 1 {
        d[i] = (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * m[i] + m[i + 1]) / 6.0;
    }
    let last = n - 1;
    d[last] = (y[last] - y[last - 1]) / h[last - 1] + h[last - 1] * (m[last - 1] + 2.0 * m[last]) / 6.0;
    Ok(d)
}

/// Zero of the Hermite cubic's derivative inside the bracketing interval
/// `[x[bracket], x[bracket + 1]]`.
///
/// Returns NaN when the quadratic has no root inside the bracket; the
/// caller maps that to the safe "no step" value.
pub fn cubic_min(x: &[f64], y: &[f64], d: &[f64], bracket: usize) -> f64 {
    let a = x[bracket];
    let b = x[bracket + 1];
    let h = b - a;
    let da = d[bracket];
    let db = d[bracket + 1];
    let s = (y[bracket + 1] - y[bracket]) / h;

    // derivative of the Hermite cubic in the unit parameter tau
    let c2 = 3.0 * (da + db) - 6.0 * s;
    let c1 = 6.0 * s - 4.0 * da - 2.0 * db;
    let c0 = da;

    let in_unit = |t: f64| (0.0..=1.0).contains(&t);
    let tau = if c2.abs() < 1e-14 * (c1.abs() + c0.abs()) {
        // effectively quadratic data
        let t = -c0 / c1;
        if in_unit(t) {
            t
        } else {
            f64::NAN
        }
    } else {
        let disc = c1 * c1 - 4.0 * c2 * c0;
        if disc < 0.0 {
            return f64::NAN;
        }
        let r = disc.sqrt();
        let t1 = (-c1 - r) / (2.0 * c2);
        let t2 = (-c1 + r) / (2.0 * c2);
        // prefer the root where the cubic curves upward (a minimum)
        let curves_up = |t: f64| 2.0 * c2 * t + c1 > 0.0;
        match (in_unit(t1), in_unit(t2)) {
            (true, true) => {
                if curves_up(t1) {
                    t1
                } else {
                    t2
                }
            }
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => f64::NAN,
        }
    };
    a + tau * h
}
