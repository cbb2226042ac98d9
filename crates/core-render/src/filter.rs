//! Scaling filter selection and the underlying kernel shapes.
//!
//! Every filter except `Nearest` is a separable convolution described by a
//! support window (half-width in input pixels at scale 1) and a weight
//! function over the absolute distance from the sample center. `Average` is
//! the box kernel under its historical name; the two are bitwise identical.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    Nearest,
    Average,
    #[default]
    Box,
    Bilinear,
    Bicubic,
    Mks13,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::Nearest,
        Filter::Average,
        Filter::Box,
        Filter::Bilinear,
        Filter::Bicubic,
        Filter::Mks13,
    ];

    /// Whether the filter runs through the convolution pipeline.
    pub fn is_kernel(self) -> bool {
        !matches!(self, Filter::Nearest)
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Nearest => "nearest",
            Filter::Average => "average",
            Filter::Box => "box",
            Filter::Bilinear => "bilinear",
            Filter::Bicubic => "bicubic",
            Filter::Mks13 => "mks13",
        }
    }

    /// Support half-width in input pixels at scale 1.
    pub(crate) fn window(self) -> f64 {
        match self {
            Filter::Nearest => 0.0,
            Filter::Average | Filter::Box => 0.5,
            Filter::Bilinear => 1.0,
            Filter::Bicubic => 2.0,
            Filter::Mks13 => 2.5,
        }
    }

    /// Evaluate the kernel at distance `x >= 0` from the sample center.
    pub(crate) fn eval(self, x: f64) -> f64 {
        match self {
            Filter::Nearest => 0.0,
            Filter::Average | Filter::Box => {
                if x <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Filter::Bilinear => {
                if x < 1.0 {
                    1.0 - x
                } else {
                    0.0
                }
            }
            // Catmull-Rom spline (B = 0, C = 0.5).
            Filter::Bicubic => {
                if x <= 1.0 {
                    (1.5 * x - 2.5) * x * x + 1.0
                } else if x <= 2.0 {
                    ((-0.5 * x + 2.5) * x - 4.0) * x + 2.0
                } else {
                    0.0
                }
            }
            // Magic Kernel with the 2013 Sharp approximation, knots at 0.5
            // and 1.5, zero beyond 2.5.
            Filter::Mks13 => {
                if x <= 0.5 {
                    17.0 / 16.0 - 1.75 * x * x
                } else if x <= 1.5 {
                    (x - 2.75) * x + 1.75
                } else if x <= 2.5 {
                    (-0.125 * x + 0.625) * x - 25.0 / 32.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for f in Filter::ALL {
            assert_eq!(f.name().parse::<Filter>(), Ok(f));
        }
        assert!("lanczos".parse::<Filter>().is_err());
    }

    #[test]
    fn kernels_peak_at_center() {
        for f in [Filter::Box, Filter::Bilinear, Filter::Bicubic, Filter::Mks13] {
            let peak = f.eval(0.0);
            assert!(peak > 0.9, "{f} peak {peak}");
            assert_eq!(f.eval(f.window() + 0.01), 0.0, "{f} support bound");
        }
    }

    #[test]
    fn mks13_piece_boundaries_agree() {
        let f = Filter::Mks13;
        let eps = 1e-9;
        assert!((f.eval(0.5 - eps) - f.eval(0.5 + eps)).abs() < 1e-6);
        assert!((f.eval(1.5 - eps) - f.eval(1.5 + eps)).abs() < 1e-6);
        assert!(f.eval(2.5 + eps).abs() < 1e-12);
    }

    #[test]
    fn average_aliases_box() {
        for i in 0..20 {
            let x = i as f64 * 0.05;
            assert_eq!(Filter::Average.eval(x), Filter::Box.eval(x));
        }
    }
}
