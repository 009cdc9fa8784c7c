//! Conjugate-gradient gauge fixing for SU(3) lattice configurations.
//!
//! The crate minimises the Landau or Coulomb gauge-fixing functional
//! with a Polak-Ribière conjugate gradient. The derivative field gives
//! the descent direction and a cubic line search picks the step size.
//! An optional momentum-space preconditioner flattens the slow
//! long-wavelength modes. Entry points are [`landau::landau_fix`] and
//! [`landau::coulomb_fix`].

pub mod consts;
pub mod deriv;
pub mod error;
pub mod fourier;
pub mod functional;
pub mod landau;
pub mod lattice;
pub mod linesearch;
pub mod prelude;
pub mod reduce;
pub mod spline;
pub mod sun;
