//! Fixed-point 1-D resampling kernels.
//!
//! A [`Kernel`] maps every output index of one axis to a run of contributing
//! input indices and their weights. Weights are stored as `i32` scaled by
//! `2^FIXED_BITS`; after normalization the weights of every output sum to
//! exactly `FIXED_ONE` (the middle tap absorbs the rounding residue).
//!
//! Construction rules:
//! * The sample center for output `o` (with `offset` outputs clipped off
//!   before it) is `(o + offset + 0.5) / scale - 0.5` in input coordinates.
//! * The support half-width is `window / min(scale, 1)`: support widens on
//!   downscale so the kernel keeps its low-pass behavior.
//! * On downscale, distances are evaluated in output space
//!   (`|input - center| * scale`); on upscale in input space.
//! * Leading and trailing zero fixed-point weights are dropped, and the
//!   smallest/largest input indices actually touched are recorded so the
//!   intermediate buffer can be sized to just the contributing band.

use crate::filter::Filter;

pub const FIXED_BITS: u32 = 14;
pub const FIXED_ONE: i32 = 1 << FIXED_BITS;

#[derive(Debug, Clone, Copy)]
struct Tap {
    /// First contributing input index.
    start: usize,
    /// Offset into the shared weight buffer.
    w_off: usize,
    w_len: usize,
}

/// Resampling weights for one axis of one render call.
#[derive(Debug, Clone)]
pub struct Kernel {
    taps: Vec<Tap>,
    weights: Vec<i32>,
    min_input: usize,
    max_input: usize,
}

impl Kernel {
    /// Build the kernel mapping `src_size` inputs onto `dst_size` outputs at
    /// `scale`, skipping the first `offset` outputs (clipped off-window).
    pub fn build(
        filter: Filter,
        src_size: usize,
        offset: usize,
        dst_size: usize,
        scale: f64,
    ) -> Kernel {
        debug_assert!(filter.is_kernel());
        debug_assert!(src_size > 0 && dst_size > 0 && scale > 0.0);

        let half = filter.window() / scale.min(1.0);
        let downscale = scale < 1.0;

        let mut taps = Vec::with_capacity(dst_size);
        let mut weights = Vec::new();
        let mut min_input = usize::MAX;
        let mut max_input = 0usize;

        for o in 0..dst_size {
            let center = ((o + offset) as f64 + 0.5) / scale - 0.5;
            let mut first = ((center - half).ceil() as isize).max(0);
            let mut last = ((center + half).floor() as isize).min(src_size as isize - 1);
            if last < first {
                // Degenerate support after clamping: fall back to the
                // nearest in-range sample.
                let nearest = center.round().clamp(0.0, src_size as f64 - 1.0) as isize;
                first = nearest;
                last = nearest;
            }

            let raw: Vec<f64> = (first..=last)
                .map(|i| {
                    let mut d = (i as f64 - center).abs();
                    if downscale {
                        d *= scale;
                    }
                    filter.eval(d)
                })
                .collect();
            let sum: f64 = raw.iter().sum();
            let norm = if sum > f64::EPSILON { 1.0 / sum } else { 0.0 };

            let mut fixed: Vec<i32> = if norm > 0.0 {
                raw.iter()
                    .map(|w| (w * norm * FIXED_ONE as f64).round() as i32)
                    .collect()
            } else {
                // All raw weights vanished (possible only for clamped edge
                // supports): weight the nearest sample fully.
                let mut v = vec![0; raw.len()];
                v[0] = FIXED_ONE;
                v
            };

            // The fixed-point weights must sum to exactly FIXED_ONE so a
            // constant input reproduces exactly; push the residue into the
            // tap nearest the center.
            let fixed_sum: i32 = fixed.iter().sum();
            let mid = ((center - first as f64).round() as isize)
                .clamp(0, fixed.len() as isize - 1) as usize;
            fixed[mid] += FIXED_ONE - fixed_sum;

            // Shrink the support: zero taps at either end contribute nothing.
            let mut start = first as usize;
            while fixed.len() > 1 && fixed[fixed.len() - 1] == 0 {
                fixed.pop();
            }
            while fixed.len() > 1 && fixed[0] == 0 {
                fixed.remove(0);
                start += 1;
            }

            min_input = min_input.min(start);
            max_input = max_input.max(start + fixed.len() - 1);
            taps.push(Tap {
                start,
                w_off: weights.len(),
                w_len: fixed.len(),
            });
            weights.extend_from_slice(&fixed);
        }

        Kernel {
            taps,
            weights,
            min_input,
            max_input,
        }
    }

    /// Number of output indices covered.
    #[inline]
    pub fn outputs(&self) -> usize {
        self.taps.len()
    }

    /// Contributing input run for output `o`: `(first_input, weights)`.
    #[inline]
    pub fn tap(&self, o: usize) -> (usize, &[i32]) {
        let t = self.taps[o];
        (t.start, &self.weights[t.w_off..t.w_off + t.w_len])
    }

    /// Smallest input index any output touches.
    #[inline]
    pub fn min_input(&self) -> usize {
        self.min_input
    }

    /// Largest input index any output touches (inclusive).
    #[inline]
    pub fn max_input(&self) -> usize {
        self.max_input
    }

    /// Height of the contributing input band.
    #[inline]
    pub fn support(&self) -> usize {
        self.max_input - self.min_input + 1
    }
}
