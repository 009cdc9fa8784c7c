//! Hypercubic lattice descriptor and the link field living on it.
//!
//! Sites are flattened lexicographically with direction 0 fastest and the
//! temporal direction `ND-1` slowest, so a time slice occupies the
//! contiguous index block `[t * slice_volume, (t+1) * slice_volume)`.

use crate::consts::ND;
use crate::error::GaugeFixError;
use crate::sun::{gtransform_local, Su3};
use rayon::prelude::*;

/// Geometry: extents, volumes and precomputed periodic neighbor tables.
#[derive(Clone, Debug)]
pub struct Lattice {
    dims: [usize; ND],
    volume: usize,
    slice_volume: usize,
    fwd: Vec<[usize; ND]>,
    bck: Vec<[usize; ND]>,
}

impl Lattice {
    pub fn new(dims: [usize; ND]) -> Result<Lattice, GaugeFixError> {
        if dims.iter().any(|&l| l == 0) {
            return Err(GaugeFixError::InvalidParameters(
                "lattice extents must be nonzero".into(),
            ));
        }
        let volume = dims.iter().product();
        let slice_volume = dims[..ND - 1].iter().product();

        let mut fwd = vec![[0usize; ND]; volume];
        let mut bck = vec![[0usize; ND]; volume];
        for i in 0..volume {
            let x = coords(i, &dims);
            for mu in 0..ND {
                let mut up = x;
                up[mu] = (x[mu] + 1) % dims[mu];
                let mut dn = x;
                dn[mu] = (x[mu] + dims[mu] - 1) % dims[mu];
                fwd[i][mu] = index(&up, &dims);
                bck[i][mu] = index(&dn, &dims);
            }
        }

        Ok(Lattice {
            dims,
            volume,
            slice_volume,
            fwd,
            bck,
        })
    }

    pub fn dims(&self) -> &[usize; ND] {
        &self.dims
    }

    pub fn volume(&self) -> usize {
        self.volume
    }

    /// Number of sites in one time slice.
    pub fn slice_volume(&self) -> usize {
        self.slice_volume
    }

    pub fn temporal_extent(&self) -> usize {
        self.dims[ND - 1]
    }

    #[inline]
    pub fn forward(&self, site: usize, mu: usize) -> usize {
        self.fwd[site][mu]
    }

    #[inline]
    pub fn backward(&self, site: usize, mu: usize) -> usize {
        self.bck[site][mu]
    }
}

fn coords(mut i: usize, dims: &[usize; ND]) -> [usize; ND] {
    let mut x = [0usize; ND];
    for mu in 0..ND {
        x[mu] = i % dims[mu];
        i /= dims[mu];
    }
    x
}

fn index(x: &[usize; ND], dims: &[usize; ND]) -> usize {
    let mut i = 0;
    for mu in (0..ND).rev() {
        i = i * dims[mu] + x[mu];
    }
    i
}

/// `ND` directed link matrices per site.
#[derive(Clone, Debug)]
pub struct LinkField {
    links: Vec<[Su3; ND]>,
}

impl LinkField {
    /// Cold start: every link the identity.
    pub fn cold(lat: &Lattice) -> LinkField {
        LinkField {
            links: vec![[Su3::identity(); ND]; lat.volume()],
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    #[inline]
    pub fn link(&self, site: usize, mu: usize) -> &Su3 {
        &self.links[site][mu]
    }

    pub fn link_mut(&mut self, site: usize, mu: usize) -> &mut Su3 {
        &mut self.links[site][mu]
    }

    /// Apply a volume gauge transformation,
    /// `U_mu(x) <- g_x U_mu(x) g_{x+mu}†`, reunitarising every link.
    pub fn gauge_transform(&mut self, lat: &Lattice, gauge: &[Su3]) -> Result<(), GaugeFixError> {
        if gauge.len() != lat.volume() {
            return Err(GaugeFixError::BufferLengthMismatch {
                expected: lat.volume(),
                found: gauge.len(),
            });
        }
        self.links.par_iter_mut().enumerate().for_each(|(i, site)| {
            for mu in 0..ND {
                let mut u = gtransform_local(&gauge[i], &site[mu], &gauge[lat.forward(i, mu)]);
                u.reunit();
                site[mu] = u;
            }
        });
        Ok(())
    }

    /// Apply a single-slice gauge transformation at time `t` (Coulomb).
    ///
    /// Spatial links inside the slice rotate on both ends; the temporal
    /// links leaving slice `t` rotate on the left, those arriving from
    /// `t-1` on the right.
    pub fn apply_slice_transform(
        &mut self,
        lat: &Lattice,
        gauge: &[Su3],
        t: usize,
    ) -> Result<(), GaugeFixError> {
        let lcu = lat.slice_volume();
        if gauge.len() != lcu {
            return Err(GaugeFixError::BufferLengthMismatch {
                expected: lcu,
                found: gauge.len(),
            });
        }
        if t >= lat.temporal_extent() {
            return Err(GaugeFixError::InvalidSlice {
                slice: t,
                extent: lat.temporal_extent(),
            });
        }
        let t_prev = (t + lat.temporal_extent() - 1) % lat.temporal_extent();

        self.links[t * lcu..(t + 1) * lcu]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, site)| {
                for mu in 0..ND - 1 {
                    let mut u = gtransform_local(&gauge[i], &site[mu], &gauge[lat.forward(i, mu)]);
                    u.reunit();
                    site[mu] = u;
                }
                let mut u = gauge[i].mul(&site[ND - 1]);
                u.reunit();
                site[ND - 1] = u;
            });

        self.links[t_prev * lcu..(t_prev + 1) * lcu]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, site)| {
                let mut u = site[ND - 1].mul_dag(&gauge[i]);
                u.reunit();
                site[ND - 1] = u;
            });
        Ok(())
    }
}
