//! Image containers and their lifecycle.
//!
//! An [`Image`] is the unit the list, the caches, and both UI modes pass
//! around: source identity plus lazily attached decoded state (frames,
//! thumbnail, metadata). Decoded state lives behind a mutex so loader
//! threads can attach results while the main thread traverses.

mod image;
mod thumbs;

pub use image::{
    FileStat, Frame, Image, ImageData, ImageError, Parts, RenderHooks, SKIP_AFTER_FAILURES,
};
pub use thumbs::{ThumbError, ThumbParams, export_png, load_thumbnail, prune, save_thumbnail};
