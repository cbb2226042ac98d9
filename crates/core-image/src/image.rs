//! The image entry: source identity, file metadata, and decoded state.
//!
//! Ownership model: the list and the caches share `Arc<Image>` handles; the
//! decoded payload ([`ImageData`]) has exactly one home inside the entry's
//! mutex and is moved in with [`Image::attach`] (merge into empty slots
//! only) and released with [`Image::clear`]. Removal from the list never
//! frees an entry a cache still holds; the list instead tells the caches to
//! evict by source.
//!
//! Invariants:
//! * `name()` is the byte suffix of `source()` after the last `/`.
//! * A frame pixmap tagged `argb` is the only way `alpha` can be true.
//! * `frames` and `thumbnail` are independent: either may exist alone.

use core_pixmap::{Color, PixelFormat, Pixmap, PixmapError, Rotation};
use core_render::{Filter, Renderer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::warn;

/// Consecutive decode failures after which traversal skips the entry.
pub const SKIP_AFTER_FAILURES: u32 = 2;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image has no frames")]
    NoFrames,
    #[error(transparent)]
    Pixmap(#[from] PixmapError),
}

/// One decoded frame: pixels plus display duration (0 for static images).
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixmap: Pixmap,
    pub duration_ms: u32,
}

impl Frame {
    pub fn new(pixmap: Pixmap) -> Self {
        Self {
            pixmap,
            duration_ms: 0,
        }
    }

    pub fn with_duration(pixmap: Pixmap, duration_ms: u32) -> Self {
        Self {
            pixmap,
            duration_ms,
        }
    }
}

bitflags::bitflags! {
    /// Sub-resources selectable by [`Image::clear`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Parts: u8 {
        const FRAMES    = 0b001;
        const THUMBNAIL = 0b010;
        const INFO      = 0b100;
        const ALL       = 0b111;
    }
}

/// File metadata captured at insertion and refreshed on reload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FileStat {
    pub size: u64,
    /// Modification time as nanoseconds since the epoch; 0 when unknown
    /// (pipes, exec sources).
    pub mtime_ns: u128,
}

/// Decoder hook overrides. Raster formats use the default frame-array
/// operations; vector formats override `render` to re-rasterize at the
/// requested scale and `flip`/`rotate` to update their model instead of the
/// pixels. Resource release maps onto `Drop`.
pub trait RenderHooks: Send + Sync {
    /// Paint `frame` scaled into `dst`; return false to fall back to the
    /// default pixmap render.
    fn render(
        &self,
        _data: &ImageData,
        _frame: usize,
        _renderer: &Renderer,
        _dst: &mut Pixmap,
        _x: isize,
        _y: isize,
        _scale: f64,
    ) -> bool {
        false
    }

    /// Return false to fall back to per-frame pixmap flips.
    fn flip(&self, _data: &mut ImageData, _vertical: bool) -> bool {
        false
    }

    /// Return false to fall back to per-frame pixmap rotation.
    fn rotate(&self, _data: &mut ImageData, _rotation: Rotation) -> bool {
        false
    }
}

/// Decoded state attached to an entry.
#[derive(Default)]
pub struct ImageData {
    /// Human-readable format tag set by the decoder ("PNG", "GIF", ...).
    pub format: Option<String>,
    /// True when any frame has non-opaque pixels.
    pub alpha: bool,
    pub frames: Vec<Frame>,
    pub thumbnail: Option<Pixmap>,
    /// Ordered key/value pairs shown by the info overlay.
    pub info: Vec<(String, String)>,
    pub hooks: Option<Arc<dyn RenderHooks>>,
}

impl ImageData {
    /// Dimensions of the first frame.
    pub fn size(&self) -> Option<(usize, usize)> {
        self.frames
            .first()
            .map(|f| (f.pixmap.width(), f.pixmap.height()))
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    /// True when the image animates: more than one frame with a nonzero
    /// duration somewhere.
    pub fn animated(&self) -> bool {
        self.frames.len() > 1 && self.frames.iter().any(|f| f.duration_ms > 0)
    }

    pub fn push_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.push((key.into(), value.into()));
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("format", &self.format)
            .field("alpha", &self.alpha)
            .field("frames", &self.frames.len())
            .field("thumbnail", &self.thumbnail.is_some())
            .field("info", &self.info.len())
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// A list entry. Shared via `Arc` between the list, the caches, and the
/// active mode; all decoded state sits behind the internal mutex.
#[derive(Debug)]
pub struct Image {
    source: String,
    /// Byte offset of the basename inside `source`.
    name_off: usize,
    index: AtomicUsize,
    failures: AtomicUsize,
    skipped: AtomicBool,
    stat: Mutex<FileStat>,
    data: Mutex<ImageData>,
}

impl Image {
    pub fn new(source: impl Into<String>) -> Arc<Image> {
        let source = source.into();
        let name_off = source.rfind('/').map(|i| i + 1).unwrap_or(0);
        Arc::new(Image {
            source,
            name_off,
            index: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            skipped: AtomicBool::new(false),
            stat: Mutex::new(FileStat::default()),
            data: Mutex::new(ImageData::default()),
        })
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Basename: the suffix of `source` after the last `/`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.source[self.name_off..]
    }

    /// Directory prefix of `source` (empty for bare names and pseudo
    /// schemes). Parent-directory adjacency compares these.
    #[inline]
    pub fn parent_dir(&self) -> &str {
        self.source[..self.name_off].trim_end_matches('/')
    }

    pub fn index(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// Set by the list on every reindex; callers caching an index must
    /// refresh after list mutations.
    pub fn set_index(&self, index: usize) {
        self.index.store(index, Ordering::Relaxed);
    }

    pub fn stat(&self) -> FileStat {
        *self.stat.lock().expect("image stat lock")
    }

    pub fn set_stat(&self, stat: FileStat) {
        *self.stat.lock().expect("image stat lock") = stat;
    }

    /// Re-read size/mtime from the filesystem. Quietly keeps the previous
    /// values for non-file sources.
    pub fn refresh_stat(&self) {
        if let Ok(meta) = std::fs::metadata(&self.source) {
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            self.set_stat(FileStat {
                size: meta.len(),
                mtime_ns,
            });
        }
    }

    /// Record a decode failure; marks the entry skipped once the threshold
    /// is crossed. Returns the new failure count.
    pub fn record_failure(&self) -> u32 {
        let n = self.failures.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        if n >= SKIP_AFTER_FAILURES {
            self.skipped.store(true, Ordering::SeqCst);
            warn!(target: "image", source = self.source.as_str(), failures = n, "entry marked skipped");
        }
        n
    }

    /// Clear the failure state (explicit reload, file rewritten).
    pub fn reset_failures(&self) {
        self.failures.store(0, Ordering::SeqCst);
        self.skipped.store(false, Ordering::SeqCst);
    }

    /// True once the entry failed often enough that traversal passes it by.
    pub fn is_skipped(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn lock_data(&self) -> MutexGuard<'_, ImageData> {
        self.data.lock().expect("image data lock")
    }

    pub fn has_frames(&self) -> bool {
        self.lock_data().has_frames()
    }

    pub fn has_thumbnail(&self) -> bool {
        self.lock_data().thumbnail.is_some()
    }

    /// Move-merge decoded state into this entry, filling only the slots that
    /// are still empty. The incoming container is consumed.
    pub fn attach(&self, mut incoming: ImageData) {
        let mut d = self.lock_data();
        if d.frames.is_empty() && !incoming.frames.is_empty() {
            d.frames = std::mem::take(&mut incoming.frames);
            d.alpha = incoming.alpha;
        }
        if d.thumbnail.is_none() {
            d.thumbnail = incoming.thumbnail.take();
        }
        if d.info.is_empty() {
            d.info = std::mem::take(&mut incoming.info);
        }
        if d.format.is_none() {
            d.format = incoming.format.take();
        }
        if d.hooks.is_none() {
            d.hooks = incoming.hooks.take();
        }
    }

    /// Release the selected sub-resources.
    pub fn clear(&self, parts: Parts) {
        let mut d = self.lock_data();
        if parts.contains(Parts::FRAMES) {
            d.frames = Vec::new();
            d.alpha = false;
        }
        if parts.contains(Parts::THUMBNAIL) {
            d.thumbnail = None;
        }
        if parts.contains(Parts::INFO) {
            d.info = Vec::new();
        }
    }

    /// Flip every frame (and thumbnail). Decoder hooks take precedence.
    pub fn flip(&self, vertical: bool) {
        let mut d = self.lock_data();
        if let Some(hooks) = d.hooks.clone()
            && hooks.flip(&mut d, vertical)
        {
            return;
        }
        for frame in &mut d.frames {
            if vertical {
                frame.pixmap.flip_vertical();
            } else {
                frame.pixmap.flip_horizontal();
            }
        }
        if let Some(thumb) = &mut d.thumbnail {
            if vertical {
                thumb.flip_vertical();
            } else {
                thumb.flip_horizontal();
            }
        }
    }

    /// Rotate every frame (and thumbnail). Decoder hooks take precedence.
    /// A failed 90/270 allocation leaves already-rotated frames rotated; the
    /// error carries through so callers can surface it.
    pub fn rotate(&self, rotation: Rotation) -> Result<(), ImageError> {
        let mut d = self.lock_data();
        if let Some(hooks) = d.hooks.clone()
            && hooks.rotate(&mut d, rotation)
        {
            return Ok(());
        }
        for frame in &mut d.frames {
            frame.pixmap.rotate(rotation)?;
        }
        if let Some(thumb) = &mut d.thumbnail {
            thumb.rotate(rotation)?;
        }
        Ok(())
    }

    /// Render one frame through the decoder hooks if present, else through
    /// the supplied renderer.
    #[allow(clippy::too_many_arguments)]
    pub fn render_frame(
        &self,
        frame: usize,
        renderer: &Renderer,
        dst: &mut Pixmap,
        x: isize,
        y: isize,
        scale: f64,
        filter: Filter,
        multithreaded: bool,
    ) {
        let d = self.lock_data();
        if let Some(hooks) = d.hooks.clone()
            && hooks.render(&d, frame, renderer, dst, x, y, scale)
        {
            return;
        }
        if let Some(f) = d.frames.get(frame) {
            renderer.render(&f.pixmap, dst, x, y, scale, filter, multithreaded);
        }
    }

    /// Scale frame 0 into the thumbnail slot.
    ///
    /// `fill` produces a `size x size` tile: the frame is scaled by the
    /// larger fit ratio, centered, and letterboxed with `bg`. Fit mode
    /// produces a tile shrunk to the frame's aspect.
    pub fn make_thumbnail(
        &self,
        renderer: &Renderer,
        size: usize,
        fill: bool,
        filter: Filter,
        bg: Color,
    ) -> Result<(), ImageError> {
        let mut d = self.lock_data();
        let frame = d.frames.first().ok_or(ImageError::NoFrames)?;
        let (w, h) = (frame.pixmap.width(), frame.pixmap.height());
        let sw = size as f64 / w as f64;
        let sh = size as f64 / h as f64;
        let scale = if fill { sw.max(sh) } else { sw.min(sh) };

        let mut thumb = if fill {
            let mut t = Pixmap::new(frame.pixmap.format(), size, size)?;
            t.fill(0, 0, size, size, bg);
            t
        } else {
            let tw = ((w as f64 * scale) as usize).max(1);
            let th = ((h as f64 * scale) as usize).max(1);
            Pixmap::new(frame.pixmap.format(), tw, th)?
        };
        let x = (thumb.width() as isize - (w as f64 * scale) as isize) / 2;
        let y = (thumb.height() as isize - (h as f64 * scale) as isize) / 2;
        let (x, y) = if fill { (x, y) } else { (0, 0) };

        renderer.render(&frame.pixmap, &mut thumb, x, y, scale, filter, false);
        d.thumbnail = Some(thumb);
        Ok(())
    }
}
