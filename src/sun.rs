//! SU(3) group-element primitives: the fixed-size matrix operations the
//! evaluators and accumulators are built from.
//!
//! Two representations live here. [`Su3`] is a full row-major 3x3 complex
//! matrix, used for the link variables and gauge transformations. [`Herm`]
//! is a traceless Hermitian matrix packed into `TRUE_HERM` complex slots:
//! the two free diagonal entries share slot 0 (`c0 = h11 + i*h00`) and the
//! strict upper triangle fills slots 1..3. The packed form is what the
//! search direction, derivative sums and Fourier transforms operate on.

use crate::consts::{NC, NCNC, TRUE_HERM};
use num_complex::Complex64;
use num_traits::Zero;

const W: Complex64 = Complex64::new(-0.5, 0.866_025_403_784_438_6); // exp(2πi/3)

#[inline(always)]
fn idx(r: usize, c: usize) -> usize {
    r * NC + c
}

/// A full `NC x NC` complex matrix, row-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Su3(pub [Complex64; NCNC]);

impl Su3 {
    pub fn zero() -> Self {
        Su3([Complex64::zero(); NCNC])
    }

    pub fn identity() -> Self {
        let mut m = Self::zero();
        for r in 0..NC {
            m.0[idx(r, r)] = Complex64::new(1.0, 0.0);
        }
        m
    }

    /// `self * rhs`
    pub fn mul(&self, rhs: &Su3) -> Su3 {
        let mut out = Self::zero();
        for r in 0..NC {
            for c in 0..NC {
                let mut s = Complex64::new(0.0, 0.0);
                for k in 0..NC {
                    s += self.0[idx(r, k)] * rhs.0[idx(k, c)];
                }
                out.0[idx(r, c)] = s;
            }
        }
        out
    }

    /// `self * rhs†`
    pub fn mul_dag(&self, rhs: &Su3) -> Su3 {
        let mut out = Self::zero();
        for r in 0..NC {
            for c in 0..NC {
                let mut s = Complex64::new(0.0, 0.0);
                for k in 0..NC {
                    s += self.0[idx(r, k)] * rhs.0[idx(c, k)].conj();
                }
                out.0[idx(r, c)] = s;
            }
        }
        out
    }

    pub fn adjoint(&self) -> Su3 {
        let mut out = Self::zero();
        for r in 0..NC {
            for c in 0..NC {
                out.0[idx(r, c)] = self.0[idx(c, r)].conj();
            }
        }
        out
    }

    pub fn trace(&self) -> Complex64 {
        self.0[0] + self.0[4] + self.0[8]
    }

    pub fn det(&self) -> Complex64 {
        let m = &self.0;
        m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /// Traceless Hermitian projection `(U - U†)/2i - tr/NC`, packed.
    pub fn herm_proj(&self) -> Herm {
        let m = &self.0;
        let t = (m[0].im + m[4].im + m[8].im) / NC as f64;
        let h00 = m[0].im - t;
        let h11 = m[4].im - t;
        let off = |a: Complex64, b: Complex64| {
            // (a - conj(b)) / 2i
            let d = a - b.conj();
            Complex64::new(d.im * 0.5, -d.re * 0.5)
        };
        Herm([
            Complex64::new(h11, h00),
            off(m[1], m[3]),
            off(m[2], m[6]),
            off(m[5], m[7]),
        ])
    }

    /// Principal logarithm `-i log(U)` of a special unitary matrix, packed.
    ///
    /// Eigenvalues come from the characteristic cubic and the log is
    /// assembled through Sylvester's formula, so no eigenvectors are ever
    /// formed. Near-degenerate spectra (the identity included) fall back
    /// on the first-order Hermitian projection, which agrees with the log
    /// close to the identity.
    pub fn exact_log(&self) -> Herm {
        let tr = self.trace();
        let tr2 = self.mul(self).trace();
        let c1 = (tr * tr - tr2) * 0.5;
        let roots = cubic_roots(-tr, c1, -self.det());

        let gap = (roots[0] - roots[1])
            .norm()
            .min((roots[0] - roots[2]).norm())
            .min((roots[1] - roots[2]).norm());
        if gap < 1.0e-8 {
            return self.herm_proj();
        }

        let mut l = Su3::zero();
        for j in 0..NC {
            let k = (j + 1) % NC;
            let m = (j + 2) % NC;
            let num = self
                .sub_scaled_identity(roots[k])
                .mul(&self.sub_scaled_identity(roots[m]));
            let den = (roots[j] - roots[k]) * (roots[j] - roots[m]);
            let coeff = Complex64::new(roots[j].arg(), 0.0) / den;
            for e in 0..NCNC {
                l.0[e] += num.0[e] * coeff;
            }
        }

        // hermitise; a wrapped branch can leave a +-2π trace to remove
        let h = |a: Complex64, b: Complex64| (a + b.conj()) * 0.5;
        let d0 = h(l.0[0], l.0[0]).re;
        let d1 = h(l.0[4], l.0[4]).re;
        let d2 = h(l.0[8], l.0[8]).re;
        let t = (d0 + d1 + d2) / NC as f64;
        Herm([
            Complex64::new(d1 - t, d0 - t),
            h(l.0[1], l.0[3]),
            h(l.0[2], l.0[6]),
            h(l.0[5], l.0[7]),
        ])
    }

    /// Reunitarise in place: Gram-Schmidt on the first two columns, third
    /// column rebuilt as the conjugate cross product so the determinant is
    /// exactly one.
    pub fn reunit(&mut self) {
        let mut c0 = [self.0[0], self.0[3], self.0[6]];
        let mut c1 = [self.0[1], self.0[4], self.0[7]];

        let n0 = (c0[0].norm_sqr() + c0[1].norm_sqr() + c0[2].norm_sqr()).sqrt();
        for v in c0.iter_mut() {
            *v /= n0;
        }
        let dot = c0[0].conj() * c1[0] + c0[1].conj() * c1[1] + c0[2].conj() * c1[2];
        for r in 0..NC {
            c1[r] -= dot * c0[r];
        }
        let n1 = (c1[0].norm_sqr() + c1[1].norm_sqr() + c1[2].norm_sqr()).sqrt();
        for v in c1.iter_mut() {
            *v /= n1;
        }
        let c2 = [
            (c0[1] * c1[2] - c0[2] * c1[1]).conj(),
            (c0[2] * c1[0] - c0[0] * c1[2]).conj(),
            (c0[0] * c1[1] - c0[1] * c1[0]).conj(),
        ];

        for r in 0..NC {
            self.0[idx(r, 0)] = c0[r];
            self.0[idx(r, 1)] = c1[r];
            self.0[idx(r, 2)] = c2[r];
        }
    }

    fn sub_scaled_identity(&self, lambda: Complex64) -> Su3 {
        let mut out = *self;
        for r in 0..NC {
            out.0[idx(r, r)] -= lambda;
        }
        out
    }
}

/// `g * U * h†`, the gauge transformation of a single link.
pub fn gtransform_local(g: &Su3, u: &Su3, h: &Su3) -> Su3 {
    g.mul(u).mul_dag(h)
}

/// `Re Tr(a * b * c†)` without forming the third product.
pub fn re_trace_abc_dag(a: &Su3, b: &Su3, c: &Su3) -> f64 {
    let ab = a.mul(b);
    let mut sum = 0.0;
    for e in 0..NCNC {
        sum += (ab.0[e] * c.0[e].conj()).re;
    }
    sum
}

/// Traceless Hermitian matrix in packed form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Herm(pub [Complex64; TRUE_HERM]);

impl Herm {
    pub fn zero() -> Self {
        Herm([Complex64::zero(); TRUE_HERM])
    }

    #[inline]
    pub fn h00(&self) -> f64 {
        self.0[0].im
    }

    #[inline]
    pub fn h11(&self) -> f64 {
        self.0[0].re
    }

    /// Expand to the full matrix.
    pub fn unpack(&self) -> Su3 {
        let h00 = self.h00();
        let h11 = self.h11();
        let mut m = Su3::zero();
        m.0[0] = Complex64::new(h00, 0.0);
        m.0[4] = Complex64::new(h11, 0.0);
        m.0[8] = Complex64::new(-h00 - h11, 0.0);
        m.0[1] = self.0[1];
        m.0[3] = self.0[1].conj();
        m.0[2] = self.0[2];
        m.0[6] = self.0[2].conj();
        m.0[5] = self.0[3];
        m.0[7] = self.0[3].conj();
        m
    }

    /// Real `Tr(A * B)` of two packed matrices.
    pub fn trace_ab(a: &Herm, b: &Herm) -> f64 {
        let (a00, a11) = (a.h00(), a.h11());
        let (b00, b11) = (b.h00(), b.h11());
        let diag = a00 * b00 + a11 * b11 + (a00 + a11) * (b00 + b11);
        let mut off = 0.0;
        for k in 1..TRUE_HERM {
            off += (a.0[k] * b.0[k].conj()).re;
        }
        diag + 2.0 * off
    }

    pub fn sub(&self, rhs: &Herm) -> Herm {
        let mut out = *self;
        for k in 0..TRUE_HERM {
            out.0[k] -= rhs.0[k];
        }
        out
    }

    /// Exact `exp(i * alpha * H)` by scaling-and-squaring of the Taylor
    /// series, reunitarised to pin down accumulated rounding.
    pub fn expi(&self, alpha: f64) -> Su3 {
        let h = self.unpack();
        let mut a = Su3::zero();
        for e in 0..NCNC {
            a.0[e] = Complex64::new(0.0, alpha) * h.0[e];
        }

        // scale below unit norm
        let mut norm: f64 = 0.0;
        for r in 0..NC {
            let row: f64 = (0..NC).map(|c| a.0[idx(r, c)].norm()).sum();
            norm = norm.max(row);
        }
        let k = if norm > 0.5 {
            (norm / 0.5).log2().ceil() as u32
        } else {
            0
        };
        let scale = (0.5f64).powi(k as i32);
        for e in 0..NCNC {
            a.0[e] *= scale;
        }

        let mut sum = Su3::identity();
        let mut term = Su3::identity();
        for n in 1..=14 {
            term = term.mul(&a);
            let inv = 1.0 / n as f64;
            for e in 0..NCNC {
                term.0[e] *= inv;
                sum.0[e] += term.0[e];
            }
        }
        for _ in 0..k {
            sum = sum.mul(&sum);
        }
        sum.reunit();
        sum
    }

    /// First-order `1 + i * alpha * H` completed by reunitarisation: the
    /// cheap trial-matrix expansion. Only the first two columns are built,
    /// the rest is rebuilt by [`Su3::reunit`].
    pub fn expi_approx(&self, alpha: f64) -> Su3 {
        let mut g = Su3::zero();
        let i_a = Complex64::new(0.0, alpha);
        g.0[0] = Complex64::new(1.0, alpha * self.h00());
        g.0[4] = Complex64::new(1.0, alpha * self.h11());
        g.0[1] = i_a * self.0[1];
        g.0[3] = i_a * self.0[1].conj();
        g.0[6] = i_a * self.0[2].conj();
        g.0[7] = i_a * self.0[3].conj();
        g.reunit();
        g
    }
}

/// Roots of the monic cubic `x³ + a x² + b x + c` by Cardano's method in
/// complex arithmetic.
fn cubic_roots(a: Complex64, b: Complex64, c: Complex64) -> [Complex64; 3] {
    let third = 1.0 / 3.0;
    let shift = a * third;
    let p = b - a * a * third;
    let q = c + (a * a * a * 2.0 - a * b * 9.0) / 27.0;

    let s = (q * q * 0.25 + p * p * p / 27.0).sqrt();
    let mut u = (-q * 0.5 + s).cbrt();
    if u.norm() < 1.0e-30 {
        u = (-q * 0.5 - s).cbrt();
    }
    let v = if u.norm() > 0.0 {
        -p / (u * 3.0)
    } else {
        Complex64::new(0.0, 0.0)
    };

    [
        u + v - shift,
        u * W + v * W.conj() - shift,
        u * W.conj() + v * W - shift,
    ]
}
