//! Single-image viewing state: scale, position, and animation timing.
//!
//! The viewport maps image coordinates to window coordinates through
//! `(x, y, scale)`. Invariants maintained after every operation:
//! * An axis on which the scaled image is smaller than the window is
//!   centered.
//! * On the other axes the image can never move fully off-window: the
//!   origin is clamped to `[window - scaled, 0]`.
//!
//! Animation is pure timing state here; the runtime owns the actual timer
//! and asks [`Viewport::frame_delay`] what to arm after each advance.

use core_image::Image;
use core_pixmap::{Color, PixelFormat, Pixmap};
use core_render::{Filter, Renderer};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Scale selection modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// `min(1.0, fit_window)`: never upscale, shrink to fit.
    #[default]
    FitOptimal,
    FitWindow,
    FitWidth,
    FitHeight,
    FillWindow,
    RealSize,
    /// Preserve the numeric scale across image switches.
    KeepZoom,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 7] = [
        ScaleMode::FitOptimal,
        ScaleMode::FitWindow,
        ScaleMode::FitWidth,
        ScaleMode::FitHeight,
        ScaleMode::FillWindow,
        ScaleMode::RealSize,
        ScaleMode::KeepZoom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::FitOptimal => "optimal",
            ScaleMode::FitWindow => "fit",
            ScaleMode::FitWidth => "width",
            ScaleMode::FitHeight => "height",
            ScaleMode::FillWindow => "fill",
            ScaleMode::RealSize => "real",
            ScaleMode::KeepZoom => "keep",
        }
    }
}

impl FromStr for ScaleMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScaleMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Position snap modes; `Free` leaves coordinates untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    Free,
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl PositionMode {
    pub const ALL: [PositionMode; 10] = [
        PositionMode::Free,
        PositionMode::Center,
        PositionMode::Top,
        PositionMode::Bottom,
        PositionMode::Left,
        PositionMode::Right,
        PositionMode::TopLeft,
        PositionMode::TopRight,
        PositionMode::BottomLeft,
        PositionMode::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PositionMode::Free => "free",
            PositionMode::Center => "center",
            PositionMode::Top => "top",
            PositionMode::Bottom => "bottom",
            PositionMode::Left => "left",
            PositionMode::Right => "right",
            PositionMode::TopLeft => "topleft",
            PositionMode::TopRight => "topright",
            PositionMode::BottomLeft => "bottomleft",
            PositionMode::BottomRight => "bottomright",
        }
    }
}

impl FromStr for PositionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PositionMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Background painted behind transparent image regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransparencyBg {
    /// Checkerboard grid.
    Grid,
    Color(Color),
}

/// Pan directions for step moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

const MIN_SCALE: f64 = 0.01;
const MAX_SCALE: f64 = 100.0;
const GRID_TILE: usize = 10;
const GRID_C0: Color = Color(0xff33_3333);
const GRID_C1: Color = Color(0xff4c_4c4c);

/// Construction defaults (from config).
#[derive(Debug, Clone)]
pub struct ViewportOptions {
    pub scale_mode: ScaleMode,
    pub position_mode: PositionMode,
    pub aa: Filter,
    pub aa_enabled: bool,
    pub window_bg: Color,
    pub transparent_bg: TransparencyBg,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::FitOptimal,
            position_mode: PositionMode::Center,
            aa: Filter::Mks13,
            aa_enabled: true,
            window_bg: Color::BLACK,
            transparent_bg: TransparencyBg::Grid,
        }
    }
}

pub struct Viewport {
    image: Option<Arc<Image>>,
    frame: usize,
    img_w: usize,
    img_h: usize,
    has_alpha: bool,
    scale: f64,
    x: f64,
    y: f64,
    win_w: usize,
    win_h: usize,
    mode: ScaleMode,
    def_scale: ScaleMode,
    def_position: PositionMode,
    aa: Filter,
    aa_enabled: bool,
    window_bg: Color,
    transparent_bg: TransparencyBg,
    animating: bool,
}

impl Viewport {
    pub fn new(win_w: usize, win_h: usize, options: ViewportOptions) -> Self {
        Self {
            image: None,
            frame: 0,
            img_w: 0,
            img_h: 0,
            has_alpha: false,
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            win_w,
            win_h,
            mode: options.scale_mode,
            def_scale: options.scale_mode,
            def_position: options.position_mode,
            aa: options.aa,
            aa_enabled: options.aa_enabled,
            window_bg: options.window_bg,
            transparent_bg: options.transparent_bg,
            animating: false,
        }
    }

    pub fn image(&self) -> Option<&Arc<Image>> {
        self.image.as_ref()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.mode
    }

    /// The mode applied when switching images.
    pub fn default_scale(&self) -> ScaleMode {
        self.def_scale
    }

    pub fn set_default_scale(&mut self, mode: ScaleMode) {
        self.def_scale = mode;
    }

    /// Top-left of the scaled image in window coordinates.
    pub fn origin(&self) -> (isize, isize) {
        (self.x.round() as isize, self.y.round() as isize)
    }

    pub fn window(&self) -> (usize, usize) {
        (self.win_w, self.win_h)
    }

    pub fn aa_enabled(&self) -> bool {
        self.aa_enabled
    }

    /// The filter the next draw will use.
    pub fn filter(&self) -> Filter {
        if self.aa_enabled { self.aa } else { Filter::Nearest }
    }

    pub fn set_aa(&mut self, filter: Filter) {
        self.aa = filter;
    }

    /// Toggle antialiasing; returns the new state.
    pub fn toggle_aa(&mut self) -> bool {
        self.aa_enabled = !self.aa_enabled;
        self.aa_enabled
    }

    /// Switch to a new image. Animation restarts, scale and position follow
    /// the default modes (`KeepZoom` preserves the numeric scale).
    pub fn set_image(&mut self, image: Arc<Image>) {
        self.animating = false;
        self.frame = 0;
        self.image = Some(image);
        self.refresh_image_size();
        self.mode = self.def_scale;
        self.apply_scale_mode();
        self.set_position(self.def_position);
        if self
            .image
            .as_ref()
            .is_some_and(|i| i.lock_data().animated())
        {
            self.animating = true;
        }
        debug!(
            target: "viewport",
            scale = self.scale,
            mode = self.mode.name(),
            "image set"
        );
    }

    pub fn clear_image(&mut self) {
        self.image = None;
        self.animating = false;
        self.frame = 0;
        self.img_w = 0;
        self.img_h = 0;
    }

    fn refresh_image_size(&mut self) {
        let (w, h, alpha) = self
            .image
            .as_ref()
            .map(|i| {
                let d = i.lock_data();
                let (w, h) = d
                    .frames
                    .get(self.frame)
                    .map(|f| (f.pixmap.width(), f.pixmap.height()))
                    .or_else(|| d.size())
                    .unwrap_or((0, 0));
                (w, h, d.alpha)
            })
            .unwrap_or((0, 0, false));
        self.img_w = w;
        self.img_h = h;
        self.has_alpha = alpha;
    }

    /// The image was rotated/flipped or reloaded in place: re-read its
    /// dimensions and recompute the current scale mode (a fixed mode keeps
    /// fitting the rotated image; `KeepZoom` just reclamps).
    pub fn on_image_transformed(&mut self) {
        self.refresh_image_size();
        self.apply_scale_mode();
    }

    pub fn set_window(&mut self, w: usize, h: usize) {
        self.win_w = w;
        self.win_h = h;
        self.apply_scale_mode();
    }

    fn fit_factors(&self) -> (f64, f64) {
        if self.img_w == 0 || self.img_h == 0 {
            return (1.0, 1.0);
        }
        (
            self.win_w as f64 / self.img_w as f64,
            self.win_h as f64 / self.img_h as f64,
        )
    }

    /// Set the scale mode and recompute the absolute scale from it.
    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.mode = mode;
        self.apply_scale_mode();
        if mode != ScaleMode::KeepZoom {
            self.set_position(PositionMode::Center);
        }
    }

    fn apply_scale_mode(&mut self) {
        let (wf, hf) = self.fit_factors();
        let new = match self.mode {
            ScaleMode::FitOptimal => wf.min(hf).min(1.0),
            ScaleMode::FitWindow => wf.min(hf),
            ScaleMode::FitWidth => wf,
            ScaleMode::FitHeight => hf,
            ScaleMode::FillWindow => wf.max(hf),
            ScaleMode::RealSize => 1.0,
            ScaleMode::KeepZoom => self.scale,
        };
        let anchor_center = self.mode != ScaleMode::KeepZoom;
        self.scale = new.clamp(MIN_SCALE, MAX_SCALE);
        if anchor_center {
            self.center();
        } else {
            self.clamp();
        }
    }

    /// Absolute scale keeping the image point under window pixel
    /// `(px, py)` fixed.
    pub fn set_scale_abs(&mut self, scale: f64, px: f64, py: f64) {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let ix = (px - self.x) / self.scale;
        let iy = (py - self.y) / self.scale;
        self.scale = scale;
        self.mode = ScaleMode::KeepZoom;
        self.x = px - ix * scale;
        self.y = py - iy * scale;
        self.clamp();
    }

    /// Multiply the scale by `factor`, anchored at the window center.
    pub fn zoom(&mut self, factor: f64) {
        self.set_scale_abs(
            self.scale * factor,
            self.win_w as f64 / 2.0,
            self.win_h as f64 / 2.0,
        );
    }

    /// Translate by `px` pixels in `dir`.
    pub fn step(&mut self, dir: MoveDir, px: f64) {
        match dir {
            MoveDir::Left => self.x += px,
            MoveDir::Right => self.x -= px,
            MoveDir::Up => self.y += px,
            MoveDir::Down => self.y -= px,
        }
        self.clamp();
    }

    /// One page is 90% of the window dimension.
    pub fn page(&mut self, dir: MoveDir) {
        let px = match dir {
            MoveDir::Left | MoveDir::Right => self.win_w as f64 * 0.9,
            MoveDir::Up | MoveDir::Down => self.win_h as f64 * 0.9,
        };
        self.step(dir, px);
    }

    /// Free-form drag (mouse).
    pub fn drag(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.clamp();
    }

    /// Snap to an edge/corner/center; `Free` leaves coordinates untouched.
    pub fn set_position(&mut self, mode: PositionMode) {
        let sw = self.img_w as f64 * self.scale;
        let sh = self.img_h as f64 * self.scale;
        let (cx, cy) = (
            (self.win_w as f64 - sw) / 2.0,
            (self.win_h as f64 - sh) / 2.0,
        );
        match mode {
            PositionMode::Free => {}
            PositionMode::Center => {
                self.x = cx;
                self.y = cy;
            }
            PositionMode::Top => {
                self.x = cx;
                self.y = 0.0;
            }
            PositionMode::Bottom => {
                self.x = cx;
                self.y = self.win_h as f64 - sh;
            }
            PositionMode::Left => {
                self.x = 0.0;
                self.y = cy;
            }
            PositionMode::Right => {
                self.x = self.win_w as f64 - sw;
                self.y = cy;
            }
            PositionMode::TopLeft => {
                self.x = 0.0;
                self.y = 0.0;
            }
            PositionMode::TopRight => {
                self.x = self.win_w as f64 - sw;
                self.y = 0.0;
            }
            PositionMode::BottomLeft => {
                self.x = 0.0;
                self.y = self.win_h as f64 - sh;
            }
            PositionMode::BottomRight => {
                self.x = self.win_w as f64 - sw;
                self.y = self.win_h as f64 - sh;
            }
        }
        self.clamp();
    }

    /// Per-axis invariant: center when smaller than the window, otherwise
    /// keep at least the window covered (origin in `[win - scaled, 0]`).
    fn clamp(&mut self) {
        let sw = self.img_w as f64 * self.scale;
        let sh = self.img_h as f64 * self.scale;
        if sw <= self.win_w as f64 {
            self.x = (self.win_w as f64 - sw) / 2.0;
        } else {
            self.x = self.x.clamp(self.win_w as f64 - sw, 0.0);
        }
        if sh <= self.win_h as f64 {
            self.y = (self.win_h as f64 - sh) / 2.0;
        } else {
            self.y = self.y.clamp(self.win_h as f64 - sh, 0.0);
        }
    }

    fn center(&mut self) {
        self.set_position(PositionMode::Center);
    }

    // --- animation -------------------------------------------------------

    /// Delay before the next frame advance, when animation is running.
    pub fn frame_delay(&self) -> Option<Duration> {
        if !self.animating {
            return None;
        }
        let image = self.image.as_ref()?;
        let d = image.lock_data();
        if !d.animated() {
            return None;
        }
        let ms = d.frames.get(self.frame)?.duration_ms.max(1);
        Some(Duration::from_millis(ms as u64))
    }

    /// Advance to the next frame (wrapping); returns the new frame index.
    pub fn advance_frame(&mut self) -> usize {
        let count = self
            .image
            .as_ref()
            .map(|i| i.lock_data().frames.len())
            .unwrap_or(0);
        if count > 0 {
            self.frame = (self.frame + 1) % count;
            self.refresh_image_size();
        }
        self.frame
    }

    /// Step to an adjacent frame manually (stops the animation).
    pub fn select_frame(&mut self, forward: bool) -> usize {
        self.animating = false;
        let count = self
            .image
            .as_ref()
            .map(|i| i.lock_data().frames.len())
            .unwrap_or(0);
        if count > 0 {
            self.frame = if forward {
                (self.frame + 1) % count
            } else {
                (self.frame + count - 1) % count
            };
            self.refresh_image_size();
        }
        self.frame
    }

    /// Start/stop the animation; returns whether it is now running.
    pub fn animation_ctl(&mut self, run: bool) -> bool {
        let animated = self
            .image
            .as_ref()
            .is_some_and(|i| i.lock_data().animated());
        self.animating = run && animated;
        self.animating
    }

    pub fn animating(&self) -> bool {
        self.animating
    }

    // --- drawing ---------------------------------------------------------

    /// Composite the current frame into the window buffer.
    pub fn draw(&self, renderer: &Renderer, dst: &mut Pixmap) {
        let (w, h) = (dst.width(), dst.height());
        dst.fill(0, 0, w, h, self.window_bg);
        let Some(image) = &self.image else {
            return;
        };
        let (ox, oy) = self.origin();
        let sw = (self.img_w as f64 * self.scale) as usize;
        let sh = (self.img_h as f64 * self.scale) as usize;
        if self.has_alpha {
            match self.transparent_bg {
                TransparencyBg::Grid => dst.grid(ox, oy, sw, sh, GRID_TILE, GRID_C0, GRID_C1),
                TransparencyBg::Color(c) => dst.fill(ox, oy, sw, sh, c),
            }
        }
        image.render_frame(
            self.frame,
            renderer,
            dst,
            ox,
            oy,
            self.scale,
            self.filter(),
            true,
        );
    }
}
