//! Pixel-map model: ARGB color handling and the software drawing surface.
//!
//! Everything downstream (renderer, thumbnails, window composition) works in
//! terms of [`Pixmap`]: a row-major, contiguous buffer of 32-bit ARGB pixels
//! with a format tag deciding whether the alpha byte participates in
//! composition. All drawing primitives accept signed coordinates and clip to
//! the destination bounds; geometry never fails, only allocation does.

mod color;
mod pixmap;

pub use color::Color;
pub use pixmap::{PixelFormat, Pixmap, PixmapError, Rotation};
