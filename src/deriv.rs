//! Search-direction field and the derivative scalars that drive the
//! conjugate-gradient update.

use crate::consts::{ND, TRUE_HERM};
use crate::error::GaugeFixError;
use crate::functional::GaugeFunctional;
use crate::lattice::{Lattice, LinkField};
use crate::reduce::TraceBuffer;
use crate::sun::Herm;
use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;

/// Per-site packed Hermitian direction field, stored component-major:
/// one contiguous row per generator component so each row doubles as a
/// transform buffer for the Fourier accelerator.
#[derive(Clone, Debug)]
pub struct DirectionField {
    comps: Array2<Complex64>,
}

impl DirectionField {
    pub fn zeros(len: usize) -> DirectionField {
        DirectionField {
            comps: Array2::zeros((TRUE_HERM, len)),
        }
    }

    /// Build in parallel from a per-site closure.
    pub fn from_sites<F>(len: usize, f: F) -> DirectionField
    where
        F: Fn(usize) -> Herm + Sync + Send,
    {
        let hs: Vec<Herm> = (0..len).into_par_iter().map(f).collect();
        let mut field = DirectionField::zeros(len);
        for (i, h) in hs.iter().enumerate() {
            for k in 0..TRUE_HERM {
                field.comps[[k, i]] = h.0[k];
            }
        }
        field
    }

    pub fn len(&self) -> usize {
        self.comps.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.ncols() == 0
    }

    #[inline]
    pub fn site(&self, i: usize) -> Herm {
        Herm([
            self.comps[[0, i]],
            self.comps[[1, i]],
            self.comps[[2, i]],
            self.comps[[3, i]],
        ])
    }

    pub fn set_site(&mut self, i: usize, h: Herm) {
        for k in 0..TRUE_HERM {
            self.comps[[k, i]] = h.0[k];
        }
    }

    /// Conjugate mixing `self <- grad + beta * self`.
    pub fn mix_from(&mut self, grad: &DirectionField, beta: f64) {
        self.comps.zip_mut_with(&grad.comps, |d, &g| {
            *d = g + *d * beta;
        });
    }

    /// Flat component-major storage, `TRUE_HERM` contiguous blocks of
    /// `len` entries each.
    pub(crate) fn as_flat_mut(&mut self) -> &mut [Complex64] {
        self.comps
            .as_slice_mut()
            .expect("direction field is stored contiguously")
    }
}

/// Twice the stable mean of the per-site squared direction norm
/// `0.5 Tr(H²)`: the steepest-descent normalisation and the flatness
/// criterion. Zero is the legitimate "no residual direction" signal.
pub fn sum_deriv(field: &DirectionField, buf: &mut TraceBuffer) -> f64 {
    let ave = buf.reduce(field.len(), |i| {
        let h = field.site(i);
        0.5 * Herm::trace_ab(&h, &h)
    });
    2.0 * ave
}

/// Polak-Ribière numerator: stable mean of `Tr(H_new (H_new - H_old))`.
pub fn sum_pr_numerator(
    new: &DirectionField,
    old: &DirectionField,
    buf: &mut TraceBuffer,
) -> Result<f64, GaugeFixError> {
    if new.len() != old.len() {
        return Err(GaugeFixError::BufferLengthMismatch {
            expected: new.len(),
            found: old.len(),
        });
    }
    Ok(buf.reduce(new.len(), |i| {
        let h = new.site(i);
        Herm::trace_ab(&h, &h.sub(&old.site(i)))
    }))
}

/// Landau gauge-fixing derivative over the full volume:
/// `H(x) = Σ_mu [A_mu(x-mu) - A_mu(x)]` with `A` the Hermitian projection
/// (linear variant) or exact logarithm (logarithmic variant) of the link.
pub fn landau_derivative(
    lat: &Lattice,
    links: &LinkField,
    kind: GaugeFunctional,
) -> DirectionField {
    let vol = lat.volume();
    let a: Vec<[Herm; ND]> = (0..vol)
        .into_par_iter()
        .map(|i| {
            let mut site = [Herm::zero(); ND];
            for (mu, s) in site.iter_mut().enumerate() {
                *s = match kind {
                    GaugeFunctional::Linear => links.link(i, mu).herm_proj(),
                    GaugeFunctional::Logarithmic => links.link(i, mu).exact_log(),
                };
            }
            site
        })
        .collect();

    DirectionField::from_sites(vol, |i| {
        let mut h = Herm::zero();
        for mu in 0..ND {
            let up = &a[lat.backward(i, mu)][mu];
            let dn = &a[i][mu];
            for k in 0..TRUE_HERM {
                h.0[k] += up.0[k] - dn.0[k];
            }
        }
        h
    })
}
