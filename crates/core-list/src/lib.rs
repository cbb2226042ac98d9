//! Thread-safe ordered image list, caches, filesystem monitoring, and the
//! preload engine.
//!
//! Lock discipline: the list holds one reader/writer lock. Mutating
//! operations (load, add, remove, reorder, FS events) take it exclusively;
//! traversal and queries take it shared. Entry indices handed out under the
//! shared lock may go stale once the lock is dropped; consumers caching an
//! index refresh it after any mutation.

mod cache;
mod list;
mod loader;
mod monitor;

pub use cache::Cache;
pub use list::{FsChange, FsEvent, FsEventHandler, ImageList, ListOptions, Order, Pos, numeric_cmp};
pub use loader::{LoadCallback, Loader};
pub use monitor::FsMonitor;
