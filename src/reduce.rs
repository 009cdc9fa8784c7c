//! Numerically stable reduction of per-site contributions to one scalar.
//!
//! Every evaluator funnels its per-site values through a [`TraceBuffer`]:
//! one scratch slot per site plus the precomputed `1/(i+1)` weights of the
//! online mean `ave += (x_i - ave) / (i+1)`, which keeps round-off bounded
//! over millions of terms where a naive sum-then-divide would drift.

use rayon::prelude::*;

/// Owned scratch for the stable running average.
///
/// The fill is parallel, the fold sequential, so the result is
/// deterministic for a given buffer. `&mut self` on [`reduce`] keeps one
/// reduction in flight at a time.
///
/// [`reduce`]: TraceBuffer::reduce
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    traces: Vec<f64>,
    divs: Vec<f64>,
}

impl TraceBuffer {
    pub fn new(len: usize) -> TraceBuffer {
        let mut buf = TraceBuffer {
            traces: Vec::new(),
            divs: Vec::new(),
        };
        buf.ensure(len);
        buf
    }

    pub fn capacity(&self) -> usize {
        self.traces.len()
    }

    fn ensure(&mut self, len: usize) {
        if len > self.traces.len() {
            let old = self.divs.len();
            self.traces.resize(len, 0.0);
            self.divs.extend((old..len).map(|i| 1.0 / (i + 1) as f64));
        }
    }

    /// Fill `len` slots from the per-site closure in parallel, then fold
    /// them with the stable running mean.
    pub fn reduce<F>(&mut self, len: usize, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync,
    {
        self.ensure(len);
        self.traces[..len]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, t)| *t = f(i));
        self.average(len)
    }

    /// Stable mean of the first `len` filled slots.
    pub fn average(&self, len: usize) -> f64 {
        let mut ave = 0.0;
        for i in 0..len.min(self.traces.len()) {
            ave += (self.traces[i] - ave) * self.divs[i];
        }
        ave
    }
}
