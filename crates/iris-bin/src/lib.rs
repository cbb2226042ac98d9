//! iris runtime: application wiring, window-surface seam, and the two UI
//! modes (single-image viewer and thumbnail gallery) driving the render
//! core.

pub mod app;
pub mod gallery;
pub mod viewer;
pub mod winsys;

pub use app::{App, Settings, UiMode};
pub use winsys::{CursorType, SoftSurface, Surface};
