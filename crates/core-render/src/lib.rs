//! Multithreaded software scaler.
//!
//! Paints one pixmap into another at an arbitrary position and scale using
//! nearest-neighbor or one of the separable convolution filters (box,
//! bilinear, bicubic Catmull-Rom, MKS13), in fixed-point arithmetic. Large
//! renders can be row-banded across a worker pool; the output is bitwise
//! identical either way.

mod engine;
mod filter;
pub mod kernel;
mod worker;

pub use engine::{MT_MIN_AREA, Renderer};
pub use filter::Filter;
