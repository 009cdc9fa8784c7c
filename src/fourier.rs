//! Fourier acceleration: momentum-space preconditioning of the search
//! direction.
//!
//! Each generator component of the direction field is carried to momentum
//! space, multiplied by the `p²`-derived weights and carried back. The
//! plans are strongly typed wrappers over per-axis line transforms; with
//! the `fft` feature disabled the whole step degrades to a documented
//! pass-through, so callers always tolerate unaccelerated gradients.

use crate::deriv::DirectionField;
use crate::error::GaugeFixError;
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;
#[cfg(feature = "fft")]
use std::sync::Arc;

#[cfg(feature = "fft")]
use rustfft::{Fft, FftDirection, FftPlanner};

/// A reusable in-place multidimensional DFT over a flattened index with
/// the first extent fastest (the lattice site ordering).
pub struct DftPlan {
    extents: Vec<usize>,
    len: usize,
    #[cfg(feature = "fft")]
    lines: Vec<Arc<dyn Fft<f64>>>,
    #[cfg(feature = "fft")]
    inverse: bool,
}

impl DftPlan {
    pub fn forward(extents: &[usize]) -> DftPlan {
        Self::plan(extents, false)
    }

    /// Backward transform; folds the `1/N` normalisation in so that
    /// forward-then-backward is the identity.
    pub fn backward(extents: &[usize]) -> DftPlan {
        Self::plan(extents, true)
    }

    #[cfg(feature = "fft")]
    fn plan(extents: &[usize], inverse: bool) -> DftPlan {
        let mut planner = FftPlanner::new();
        let dir = if inverse {
            FftDirection::Inverse
        } else {
            FftDirection::Forward
        };
        DftPlan {
            extents: extents.to_vec(),
            len: extents.iter().product(),
            lines: extents.iter().map(|&l| planner.plan_fft(l, dir)).collect(),
            inverse,
        }
    }

    #[cfg(not(feature = "fft"))]
    fn plan(extents: &[usize], _inverse: bool) -> DftPlan {
        DftPlan {
            extents: extents.to_vec(),
            len: extents.iter().product(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Execute the plan in place over one component buffer.
    #[cfg(feature = "fft")]
    pub fn execute(&self, data: &mut [Complex64]) -> Result<(), GaugeFixError> {
        if data.len() != self.len {
            return Err(GaugeFixError::PlanLengthMismatch {
                expected: self.len,
                found: data.len(),
            });
        }
        let mut stride = 1;
        for (fft, &l) in self.lines.iter().zip(&self.extents) {
            let mut line = vec![Complex64::new(0.0, 0.0); l];
            let blocks = self.len / (l * stride);
            for outer in 0..blocks {
                for inner in 0..stride {
                    let base = outer * l * stride + inner;
                    for (k, v) in line.iter_mut().enumerate() {
                        *v = data[base + k * stride];
                    }
                    fft.process(&mut line);
                    for (k, v) in line.iter().enumerate() {
                        data[base + k * stride] = *v;
                    }
                }
            }
            stride *= l;
        }
        if self.inverse {
            let norm = 1.0 / self.len as f64;
            for v in data.iter_mut() {
                *v *= norm;
            }
        }
        Ok(())
    }

    /// Transform library unavailable: the plan is a no-op.
    #[cfg(not(feature = "fft"))]
    pub fn execute(&self, data: &mut [Complex64]) -> Result<(), GaugeFixError> {
        if data.len() != self.len {
            return Err(GaugeFixError::PlanLengthMismatch {
                expected: self.len,
                found: data.len(),
            });
        }
        Ok(())
    }
}

/// Momentum weights `p²_max / p²` on the given extents, with the lattice
/// momentum `p² = Σ 4 sin²(π n / L)` and the zero mode pinned to one.
pub fn momentum_multipliers(extents: &[usize]) -> Vec<f64> {
    let len: usize = extents.iter().product();
    let p2_max = 4.0 * extents.len() as f64;
    (0..len)
        .map(|mut i| {
            let mut p2 = 0.0;
            for &l in extents {
                let n = i % l;
                i /= l;
                let s = (PI * n as f64 / l as f64).sin();
                p2 += 4.0 * s * s;
            }
            if p2 > 0.0 {
                p2_max / p2
            } else {
                1.0
            }
        })
        .collect()
}

/// Preconditions a direction field in momentum space.
pub struct FourierAccelerator {
    forward: DftPlan,
    backward: DftPlan,
    psq: Vec<f64>,
}

impl FourierAccelerator {
    /// Plans over arbitrary extents with caller-supplied weights.
    pub fn new(extents: &[usize], psq: Vec<f64>) -> Result<FourierAccelerator, GaugeFixError> {
        let len: usize = extents.iter().product();
        if psq.len() != len {
            return Err(GaugeFixError::PlanLengthMismatch {
                expected: len,
                found: psq.len(),
            });
        }
        Ok(FourierAccelerator {
            forward: DftPlan::forward(extents),
            backward: DftPlan::backward(extents),
            psq,
        })
    }

    /// Accelerator for the full volume (Landau).
    pub fn landau(lat: &crate::lattice::Lattice) -> Result<FourierAccelerator, GaugeFixError> {
        Self::new(lat.dims(), momentum_multipliers(lat.dims()))
    }

    /// Accelerator for one spatial slice (Coulomb).
    pub fn coulomb(lat: &crate::lattice::Lattice) -> Result<FourierAccelerator, GaugeFixError> {
        let spatial = &lat.dims()[..crate::consts::ND - 1];
        Self::new(spatial, momentum_multipliers(spatial))
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Forward transform, multiply, backward transform, one generator
    /// component at a time. Components run concurrently; within a
    /// component the three steps are strictly ordered.
    ///
    /// Without the `fft` feature this is a pass-through.
    pub fn accelerate(&self, field: &mut DirectionField) -> Result<(), GaugeFixError> {
        let len = self.forward.len();
        if field.len() != len {
            return Err(GaugeFixError::PlanLengthMismatch {
                expected: len,
                found: field.len(),
            });
        }

        if cfg!(not(feature = "fft")) {
            return Ok(());
        }

        field
            .as_flat_mut()
            .par_chunks_exact_mut(len)
            .try_for_each(|row| {
                self.forward.execute(row)?;
                for (v, &p) in row.iter_mut().zip(&self.psq) {
                    *v *= p;
                }
                self.backward.execute(row)
            })
    }
}
