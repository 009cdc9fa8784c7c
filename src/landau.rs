//! Conjugate-gradient drivers for Landau and Coulomb gauge fixing.
//!
//! `landau_fix` minimises the functional over the full volume in one
//! run; `coulomb_fix` runs the same descent independently on every
//! time slice. Both share the settings/report pair below.

use crate::consts::ND;
use crate::deriv::{landau_derivative, sum_deriv, sum_pr_numerator};
use crate::error::GaugeFixError;
use crate::fourier::FourierAccelerator;
use crate::functional::{
    build_gauge, evaluate_alpha, lattice_functional, slice_derivative, ExpStyle, GaugeFunctional,
};
use crate::lattice::{Lattice, LinkField};
use crate::linesearch::approx_minimum;
use crate::reduce::TraceBuffer;

/// Probe window below this width cannot move the links meaningfully.
const MIN_PROBE_WIDTH: f64 = 1e-8;

/// Tuning knobs for the conjugate-gradient descent.
#[derive(Clone, Debug, PartialEq)]
pub struct CgSettings {
    /// Functional being minimised.
    pub functional: GaugeFunctional,
    /// How trial matrices are exponentiated.
    pub exp_style: ExpStyle,
    /// Nominal step size, also the initial probe window width.
    pub gf_alpha: f64,
    /// Convergence target on the derivative norm theta.
    pub accuracy: f64,
    /// Iteration cap per run (per slice in the Coulomb case).
    pub max_iters: usize,
    /// Momentum-space preconditioning of the derivative field.
    pub fourier_accelerate: bool,
}

impl Default for CgSettings {
    fn default() -> Self {
        CgSettings {
            functional: GaugeFunctional::Linear,
            exp_style: ExpStyle::Approx,
            gf_alpha: 0.08,
            accuracy: 1e-12,
            max_iters: 1000,
            fourier_accelerate: true,
        }
    }
}

impl CgSettings {
    fn validate(&self) -> Result<(), GaugeFixError> {
        if !(self.gf_alpha > 0.0 && self.gf_alpha.is_finite()) {
            return Err(GaugeFixError::InvalidParameters(format!(
                "gf_alpha must be a positive finite step, got {}",
                self.gf_alpha
            )));
        }
        if !(self.accuracy > 0.0 && self.accuracy.is_finite()) {
            return Err(GaugeFixError::InvalidParameters(format!(
                "accuracy must be a positive finite target, got {}",
                self.accuracy
            )));
        }
        if self.max_iters == 0 {
            return Err(GaugeFixError::InvalidParameters(
                "max_iters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a gauge-fixing run.
#[derive(Clone, Debug, PartialEq)]
pub struct CgReport {
    functional: f64,
    theta: f64,
    iters: usize,
    converged: bool,
    history: Vec<f64>,
}

impl CgReport {
    /// Final functional value, 0.0 for a perfectly fixed configuration.
    pub fn functional(&self) -> f64 {
        self.functional
    }

    /// Final derivative norm.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Iterations consumed (largest per-slice count in the Coulomb case).
    pub fn iters(&self) -> usize {
        self.iters
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Functional value after each iteration (final per-slice values in
    /// the Coulomb case).
    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

/// Fix the configuration to Landau gauge.
///
/// Polak-Ribière conjugate gradient: each iteration probes the
/// functional at three step sizes along the current direction, takes
/// the cubic-model minimum, applies the resulting transformation and
/// conjugately mixes the fresh derivative into the direction.
pub fn landau_fix(
    lat: &Lattice,
    links: &mut LinkField,
    settings: &CgSettings,
) -> Result<CgReport, GaugeFixError> {
    settings.validate()?;
    let kind = settings.functional;
    let style = settings.exp_style;
    let accel = if settings.fourier_accelerate {
        Some(FourierAccelerator::landau(lat)?)
    } else {
        None
    };
    let mut buf = TraceBuffer::new(lat.volume());

    let mut grad = landau_derivative(lat, links, kind);
    if let Some(a) = &accel {
        a.accelerate(&mut grad)?;
    }
    let mut theta = sum_deriv(&grad, &mut buf);
    let mut dir = grad.clone();

    let mut history = Vec::new();
    let mut width = settings.gf_alpha;
    let mut iters = 0;
    let mut converged = theta < settings.accuracy;

    while !converged && iters < settings.max_iters {
        let f0 = lattice_functional(lat, links, kind, &mut buf);
        let half = build_gauge(&dir, 0.5 * width, style);
        let f_half = evaluate_alpha(lat, links, &half, ND, 0, kind, &mut buf)?;
        let full = build_gauge(&dir, width, style);
        let f_full = evaluate_alpha(lat, links, &full, ND, 0, kind, &mut buf)?;
        let best = approx_minimum(
            &[0.0, 0.5 * width, width],
            &[f0, f_half, f_full],
            settings.gf_alpha,
        )?;

        if best > 0.0 {
            let g = build_gauge(&dir, best, style);
            links.gauge_transform(lat, &g)?;
        }

        // shrink the window when the search refuses to move, widen it
        // again when the minimum sits on the far edge
        if best == 0.0 {
            width *= 0.5;
            if width < MIN_PROBE_WIDTH {
                log::debug!("probe window collapsed at iteration {}", iters);
                break;
            }
        } else if best >= width {
            width = (2.0 * width).min(settings.gf_alpha);
        }

        let mut new_grad = landau_derivative(lat, links, kind);
        if let Some(a) = &accel {
            a.accelerate(&mut new_grad)?;
        }
        let theta_new = sum_deriv(&new_grad, &mut buf);
        let beta = if theta > 0.0 {
            (sum_pr_numerator(&new_grad, &grad, &mut buf)? / theta).max(0.0)
        } else {
            0.0
        };
        dir.mix_from(&new_grad, beta);
        grad = new_grad;
        theta = theta_new;

        iters += 1;
        let f_now = lattice_functional(lat, links, kind, &mut buf);
        history.push(f_now);
        log::debug!(
            "landau iter {} theta {:.6e} functional {:.12e} step {:.6e}",
            iters,
            theta,
            f_now,
            best
        );
        converged = theta < settings.accuracy;
    }

    let functional = lattice_functional(lat, links, kind, &mut buf);
    if converged {
        log::info!(
            "landau gauge fixed in {} iterations, theta {:.6e}",
            iters,
            theta
        );
    } else {
        log::info!(
            "landau gauge fixing stopped after {} iterations, theta {:.6e}",
            iters,
            theta
        );
    }
    Ok(CgReport {
        functional,
        theta,
        iters,
        converged,
        history,
    })
}

/// Fix the configuration to Coulomb gauge, one time slice at a time.
///
/// Each slice is an independent minimisation over its own spatial
/// links; temporal links pick up the slice transformations on either
/// end but never enter the functional.
pub fn coulomb_fix(
    lat: &Lattice,
    links: &mut LinkField,
    settings: &CgSettings,
) -> Result<CgReport, GaugeFixError> {
    settings.validate()?;
    let kind = settings.functional;
    let style = settings.exp_style;
    let accel = if settings.fourier_accelerate {
        Some(FourierAccelerator::coulomb(lat)?)
    } else {
        None
    };
    let mut buf = TraceBuffer::new(lat.slice_volume());
    let lt = lat.temporal_extent();

    let mut history = Vec::with_capacity(lt);
    let mut worst_theta: f64 = 0.0;
    let mut most_iters = 0;
    let mut all_converged = true;

    for t in 0..lt {
        let (mut grad, mut f_slice) = slice_derivative(lat, links, t, kind, &mut buf)?;
        if let Some(a) = &accel {
            a.accelerate(&mut grad)?;
        }
        let mut theta = sum_deriv(&grad, &mut buf);
        let mut dir = grad.clone();

        let mut width = settings.gf_alpha;
        let mut iters = 0;
        let mut converged = theta < settings.accuracy;

        while !converged && iters < settings.max_iters {
            let half = build_gauge(&dir, 0.5 * width, style);
            let f_half = evaluate_alpha(lat, links, &half, ND - 1, t, kind, &mut buf)?;
            let full = build_gauge(&dir, width, style);
            let f_full = evaluate_alpha(lat, links, &full, ND - 1, t, kind, &mut buf)?;
            let best = approx_minimum(
                &[0.0, 0.5 * width, width],
                &[f_slice, f_half, f_full],
                settings.gf_alpha,
            )?;

            if best > 0.0 {
                let g = build_gauge(&dir, best, style);
                links.apply_slice_transform(lat, &g, t)?;
            }

            if best == 0.0 {
                width *= 0.5;
                if width < MIN_PROBE_WIDTH {
                    log::debug!("slice {} probe window collapsed at iteration {}", t, iters);
                    break;
                }
            } else if best >= width {
                width = (2.0 * width).min(settings.gf_alpha);
            }

            let (mut new_grad, f_new) = slice_derivative(lat, links, t, kind, &mut buf)?;
            if let Some(a) = &accel {
                a.accelerate(&mut new_grad)?;
            }
            let theta_new = sum_deriv(&new_grad, &mut buf);
            let beta = if theta > 0.0 {
                (sum_pr_numerator(&new_grad, &grad, &mut buf)? / theta).max(0.0)
            } else {
                0.0
            };
            dir.mix_from(&new_grad, beta);
            grad = new_grad;
            theta = theta_new;
            f_slice = f_new;

            iters += 1;
            log::debug!(
                "coulomb slice {} iter {} theta {:.6e} functional {:.12e}",
                t,
                iters,
                theta,
                f_slice
            );
            converged = theta < settings.accuracy;
        }

        log::debug!(
            "coulomb slice {} done: {} iterations, theta {:.6e}",
            t,
            iters,
            theta
        );
        history.push(f_slice);
        worst_theta = worst_theta.max(theta);
        most_iters = most_iters.max(iters);
        all_converged &= converged;
    }

    let functional = history.iter().sum::<f64>() / lt as f64;
    log::info!(
        "coulomb gauge fixing over {} slices: functional {:.12e}, worst theta {:.6e}",
        lt,
        functional,
        worst_theta
    );
    Ok(CgReport {
        functional,
        theta: worst_theta,
        iters: most_iters,
        converged: all_converged,
        history,
    })
}

#[cfg(test)]
mod landau_tests {
    use super::*;
    use crate::sun::{Herm, Su3};
    use num_complex::Complex64;

    fn site_gauge(seed: f64) -> Su3 {
        let h = Herm([
            Complex64::new(0.09 * seed.sin(), 0.06 * seed.cos()),
            Complex64::new(0.04 * (2.0 * seed).sin(), -0.03),
            Complex64::new(-0.02, 0.05 * (3.0 * seed).cos()),
            Complex64::new(0.03 * (1.5 * seed).cos(), -0.04),
        ]);
        h.expi(1.0)
    }

    fn scrambled(lat: &Lattice) -> LinkField {
        let mut links = LinkField::cold(lat);
        let gauge: Vec<Su3> = (0..lat.volume())
            .map(|i| site_gauge(0.7 * i as f64 + 0.3))
            .collect();
        links
            .gauge_transform(lat, &gauge)
            .expect("full-volume gauge buffer");
        links
    }

    #[test]
    fn cold_configuration_converges_immediately() {
        let lat = Lattice::new([2, 2, 2, 2]).unwrap();
        let mut links = LinkField::cold(&lat);
        let report = landau_fix(&lat, &mut links, &CgSettings::default()).unwrap();
        assert!(report.converged());
        assert_eq!(report.iters(), 0);
        assert_eq!(report.functional(), 0.0);
        assert_eq!(report.theta(), 0.0);
    }

    #[test]
    fn gauge_orbit_of_cold_is_fixed_back() {
        let lat = Lattice::new([2, 2, 2, 2]).unwrap();
        let mut links = scrambled(&lat);
        let settings = CgSettings {
            accuracy: 1e-10,
            ..CgSettings::default()
        };
        let report = landau_fix(&lat, &mut links, &settings).unwrap();
        assert!(report.converged(), "theta {}", report.theta());
        assert!(report.functional() < 1e-8, "functional {}", report.functional());
    }

    #[test]
    fn functional_history_is_monotone_enough() {
        let lat = Lattice::new([2, 2, 2, 2]).unwrap();
        let mut links = scrambled(&lat);
        let start = {
            let mut buf = TraceBuffer::new(lat.volume());
            lattice_functional(&lat, &links, GaugeFunctional::Linear, &mut buf)
        };
        let settings = CgSettings {
            max_iters: 5,
            fourier_accelerate: false,
            ..CgSettings::default()
        };
        let report = landau_fix(&lat, &mut links, &settings).unwrap();
        assert!(!report.history().is_empty());
        assert!(report.functional() < start);
    }

    #[test]
    fn coulomb_fixes_every_slice() {
        let lat = Lattice::new([2, 2, 2, 2]).unwrap();
        let mut links = scrambled(&lat);
        let settings = CgSettings {
            accuracy: 1e-10,
            ..CgSettings::default()
        };
        let report = coulomb_fix(&lat, &mut links, &settings).unwrap();
        assert!(report.converged(), "worst theta {}", report.theta());
        assert_eq!(report.history().len(), lat.temporal_extent());
        assert!(report.functional() < 1e-8);
    }

    #[test]
    fn bad_settings_rejected() {
        let lat = Lattice::new([2, 2, 2, 2]).unwrap();
        let mut links = LinkField::cold(&lat);
        let bad = CgSettings {
            gf_alpha: 0.0,
            ..CgSettings::default()
        };
        assert!(matches!(
            landau_fix(&lat, &mut links, &bad),
            Err(GaugeFixError::InvalidParameters(_))
        ));
        let bad = CgSettings {
            max_iters: 0,
            ..CgSettings::default()
        };
        assert!(matches!(
            coulomb_fix(&lat, &mut links, &bad),
            Err(GaugeFixError::InvalidParameters(_))
        ));
    }
}
