//! gaugekit prelude.
//!
//! This module contains the most used types, traits, and functions
//! that you can import easily as a group.
//!
//! ```
//! use gaugekit::prelude::*;
//!
//! ```

#[doc(no_inline)]
pub use crate::consts::{NC, ND};

#[doc(no_inline)]
pub use crate::error::GaugeFixError;

#[doc(no_inline)]
pub use crate::lattice::{Lattice, LinkField};

#[doc(no_inline)]
pub use crate::sun::{Herm, Su3};

#[doc(no_inline)]
pub use crate::deriv::DirectionField;

#[doc(no_inline)]
pub use crate::functional::{ExpStyle, GaugeFunctional};

#[doc(no_inline)]
pub use crate::fourier::FourierAccelerator;

#[doc(no_inline)]
pub use crate::landau::{coulomb_fix, landau_fix, CgReport, CgSettings};
