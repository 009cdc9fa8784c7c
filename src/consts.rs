//! Compile-time shape of the problem: gauge group rank, lattice
//! dimensionality and the tolerances derived from them.

/// Rank of the gauge group, SU(NC).
pub const NC: usize = 3;

/// Number of entries in an `NC x NC` matrix.
pub const NCNC: usize = NC * NC;

/// Lattice dimensionality.
pub const ND: usize = 4;

/// Independent complex components of a packed traceless Hermitian
/// generator: the two free diagonal entries share one slot (real and
/// imaginary part), the strict upper triangle fills the rest.
pub const TRUE_HERM: usize = NCNC / 2;

/// Functional values whose spline derivatives sum below this are treated
/// as numerically flat.
pub const PREC_TOL: f64 = NC as f64 * 1.0e-14;
