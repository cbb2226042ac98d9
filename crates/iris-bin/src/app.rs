//! Application runtime: wiring, settings resolution, and the event loop.
//!
//! The loop is strictly serial: events from the channel are handled one at
//! a time, action sequences run to completion, and at most one paint pass
//! happens per drained batch however many `Redraw` events arrived
//! (coalescing). Decodes never run on the loop thread: opening an image
//! schedules a pool job and completes on its `Load`/`LoadFailed` event.

use crate::winsys::{CursorType, SoftSurface, Surface};
use anyhow::Result;
use core_actions::Action;
use core_decode::DecoderRegistry;
use core_events::{Event, OneshotTimer, REDRAWS_COALESCED};
use core_image::Parts;
use core_layout::Layout;
use core_list::{FsEvent, ImageList, ListOptions, Loader, Order, Pos};
use core_pixmap::Color;
use core_pool::ThreadPool;
use core_render::{Filter, Renderer};
use core_viewport::{PositionMode, ScaleMode, TransparencyBg, Viewport, ViewportOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

/// Typed settings resolved from the config file (and CLI overrides), with
/// invalid values logged and defaulted.
#[derive(Debug, Clone)]
pub struct Settings {
    pub list: ListOptions,
    pub preload: usize,
    pub history: usize,
    pub thumb_size: usize,
    pub thumb_padding: usize,
    pub thumb_fill: bool,
    pub thumb_aa: Filter,
    pub thumb_cache_mb: u64,
    pub viewport: ViewportOptions,
    pub slideshow: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&core_config::ConfigFile::default())
    }
}

fn parse_or<T: std::str::FromStr>(what: &str, raw: &str, default: T) -> T {
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(target: "config", key = what, value = raw, "invalid value, using default");
            default
        }
    }
}

impl Settings {
    pub fn from_config(file: &core_config::ConfigFile) -> Settings {
        let transparent_bg = if file.viewer.transparent_bg.eq_ignore_ascii_case("grid") {
            TransparencyBg::Grid
        } else {
            match core_config::parse_color(&file.viewer.transparent_bg) {
                Some(argb) => TransparencyBg::Color(Color(argb)),
                None => {
                    warn!(
                        target: "config",
                        value = file.viewer.transparent_bg.as_str(),
                        "invalid viewer.transparent_bg, using grid"
                    );
                    TransparencyBg::Grid
                }
            }
        };
        let window_bg = core_config::parse_color(&file.viewer.window_bg)
            .map(Color)
            .unwrap_or_else(|| {
                warn!(
                    target: "config",
                    value = file.viewer.window_bg.as_str(),
                    "invalid viewer.window_bg, using black"
                );
                Color::BLACK
            });
        Settings {
            list: ListOptions {
                order: parse_or("list.order", &file.list.order, Order::Alpha),
                reverse: file.list.reverse,
                recursive: file.list.recursive,
                wrap: file.list.r#loop,
            },
            preload: file.cache.preload,
            history: file.cache.history,
            thumb_size: file.thumbnails.size,
            thumb_padding: file.thumbnails.padding,
            thumb_fill: file.thumbnails.fill,
            thumb_aa: parse_or("thumbnails.aa", &file.thumbnails.aa, Filter::Mks13),
            thumb_cache_mb: file.thumbnails.cache_mb,
            viewport: ViewportOptions {
                scale_mode: parse_or("viewer.scale", &file.viewer.scale, ScaleMode::FitOptimal),
                position_mode: parse_or(
                    "viewer.position",
                    &file.viewer.position,
                    PositionMode::Center,
                ),
                aa: parse_or("viewer.aa", &file.viewer.aa, Filter::Mks13),
                aa_enabled: true,
                window_bg,
                transparent_bg,
            },
            slideshow: Duration::from_secs(file.slideshow.seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Viewer,
    Gallery,
}

pub struct App {
    pub list: Arc<ImageList>,
    pub loader: Arc<Loader>,
    pub registry: Arc<DecoderRegistry>,
    pub renderer: Renderer,
    pub worker_pool: Arc<ThreadPool>,
    pub surface: SoftSurface,
    pub viewport: Viewport,
    pub layout: Layout,
    pub mode: UiMode,
    pub settings: Settings,
    pub(crate) tx: Sender<Event>,
    pub(crate) anim_timer: OneshotTimer,
    pub(crate) slide_timer: OneshotTimer,
    pub(crate) slideshow_on: bool,
    pub(crate) fullscreen: bool,
    pub(crate) info_visible: bool,
    pub(crate) thumbs_dir: Option<PathBuf>,
    /// Source the viewer is waiting on; decodes never run on the loop
    /// thread, so opening is a pool job completed by `Load`/`LoadFailed`.
    pub(crate) pending_open: Option<String>,
    pub(crate) shown_any: bool,
    pub(crate) quit: Option<i32>,
}

impl App {
    /// Assemble the runtime. `sources` are loaded into the list; nothing is
    /// decoded yet.
    pub fn new(
        settings: Settings,
        sources: &[String],
        window: (usize, usize),
        tx: Sender<Event>,
    ) -> Result<App> {
        let list = ImageList::new(settings.list.clone());
        list.load(sources);

        // The list handler only forwards into the event channel; it runs
        // under the list's exclusive lock.
        {
            let forward = tx.clone();
            list.initialize(Box::new(move |event| {
                let event = match event {
                    FsEvent::Added(image) => Event::ListAdded(image),
                    FsEvent::Removed { source } => Event::ListRemoved(source),
                    FsEvent::Modified(image) => Event::ListModified(image),
                };
                if forward.try_send(event).is_err() {
                    warn!(target: "runtime", "event channel full, dropping fs event");
                }
            }));
        }

        let registry = Arc::new(DecoderRegistry::with_defaults());
        // Separate pools: preloads can block on I/O for a while and must
        // never starve the render pass barrier.
        let render_pool = Arc::new(ThreadPool::new(ThreadPool::default_threads()));
        let worker_pool = Arc::new(ThreadPool::new(ThreadPool::default_threads()));
        let loader = {
            let notify = tx.clone();
            Loader::new(
                Arc::clone(&list),
                Arc::clone(&registry),
                Arc::clone(&worker_pool),
                settings.history,
                settings.preload,
                Box::new(move |image| {
                    let index = image.index();
                    let _ = notify.blocking_send(Event::Load { image, index });
                }),
            )
        };

        let thumbs_dir = (settings.thumb_cache_mb > 0)
            .then(|| dirs::cache_dir().map(|d| d.join("iris").join("thumbs")))
            .flatten();

        Ok(App {
            loader,
            registry,
            renderer: Renderer::new(render_pool),
            worker_pool,
            surface: SoftSurface::new(window.0, window.1),
            viewport: Viewport::new(window.0, window.1, settings.viewport.clone()),
            layout: Layout::new(settings.thumb_size, settings.thumb_padding),
            mode: UiMode::Viewer,
            list,
            settings,
            tx,
            anim_timer: OneshotTimer::new(),
            slide_timer: OneshotTimer::new(),
            slideshow_on: false,
            fullscreen: false,
            info_visible: false,
            thumbs_dir,
            pending_open: None,
            shown_any: false,
            quit: None,
        })
    }

    /// True while an open is waiting for its background decode.
    pub fn opening(&self) -> bool {
        self.pending_open.is_some()
    }

    pub fn current(&self) -> Option<Arc<core_image::Image>> {
        match self.mode {
            UiMode::Viewer => self.viewport.image().cloned(),
            UiMode::Gallery => self.list.get_index(self.layout.current()),
        }
    }

    pub fn current_index(&self) -> usize {
        match self.mode {
            UiMode::Viewer => self
                .viewport
                .image()
                .map(|i| i.index())
                .unwrap_or(0),
            UiMode::Gallery => self.layout.current(),
        }
    }

    /// Open the first loadable entry. False when nothing could be decoded
    /// (startup exits with code 2 in that case).
    pub fn open_first(&mut self) -> bool {
        let Some(first) = self.list.first() else {
            return false;
        };
        self.open(first);
        true
    }

    /// Switch the viewer toward `image`. Already-decoded entries (preload
    /// and history hits) show immediately; anything else is decoded by a
    /// pool job and completed by the resulting `Load`/`LoadFailed` event,
    /// keeping decodes off the loop thread.
    pub(crate) fn open(&mut self, image: Arc<core_image::Image>) {
        self.anim_timer.cancel();
        if image.has_frames() {
            self.pending_open = None;
            self.surface.set_cursor(CursorType::Normal);
            self.show(image);
            return;
        }
        self.surface.set_cursor(CursorType::Busy);
        self.pending_open = Some(image.source().to_string());
        let tx = self.tx.clone();
        let registry = Arc::clone(&self.registry);
        self.worker_pool.add(move || {
            let index = image.index();
            match registry.load(&image) {
                Ok(()) => {
                    let _ = tx.blocking_send(Event::Load { image, index });
                }
                Err(e) => {
                    image.record_failure();
                    warn!(target: "runtime", source = image.source(), error = %e, "open decode failed");
                    let _ = tx.blocking_send(Event::LoadFailed {
                        source: image.source().to_string(),
                        index,
                    });
                }
            }
        });
    }

    /// Put a decoded image on screen. The viewer becomes the owner of the
    /// decoded data: the entry leaves both caches so eviction cannot free
    /// what is displayed.
    fn show(&mut self, image: Arc<core_image::Image>) {
        if let Some(prev) = self.viewport.image().cloned()
            && prev.source() != image.source()
        {
            self.loader.note_viewed(prev);
        }
        self.loader.claim(image.source());
        self.viewport.set_image(Arc::clone(&image));
        self.shown_any = true;
        self.arm_animation();
        self.arm_slideshow();
        self.loader.schedule_preload(image.index());
        self.update_title();
        debug!(target: "runtime", source = image.source(), index = image.index(), "opened");
    }

    /// A pending open failed: advance to the next entry still worth trying,
    /// or give up (exit 2 when nothing was ever shown).
    fn advance_past_failure(&mut self, index: usize) {
        match self.list.get(index, Pos::Next) {
            Some(next) if self.pending_open.as_deref() != Some(next.source()) => self.open(next),
            _ => {
                self.pending_open = None;
                self.surface.set_cursor(CursorType::Normal);
                if !self.shown_any {
                    warn!(target: "runtime", "no image could be opened");
                    self.quit = Some(2);
                }
            }
        }
    }

    pub(crate) fn navigate(&mut self, pos: Pos) -> bool {
        let from = self.current_index();
        let Some(target) = self.list.get(from, pos) else {
            return false;
        };
        if Some(target.source()) == self.viewport.image().map(|i| i.source()) {
            return false;
        }
        self.open(target);
        true
    }

    pub(crate) fn arm_animation(&mut self) {
        if let Some(delay) = self.viewport.frame_delay() {
            self.anim_timer
                .arm(delay, self.tx.clone(), Event::AnimationTick);
        }
    }

    pub(crate) fn arm_slideshow(&mut self) {
        if self.slideshow_on {
            self.slide_timer
                .arm(self.settings.slideshow, self.tx.clone(), Event::SlideshowTick);
        } else {
            self.slide_timer.cancel();
        }
    }

    pub(crate) fn update_title(&mut self) {
        let title = match self.current() {
            Some(image) => {
                format!("{} [{}/{}] — iris", image.name(), image.index() + 1, self.list.len())
            }
            None => "iris".to_string(),
        };
        self.surface.set_title(&title);
    }

    /// Handle one event; returns whether a repaint is needed.
    pub fn handle_event(&mut self, event: Event) -> bool {
        core_events::EVENTS_DISPATCHED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        match event {
            Event::Redraw => true,
            Event::Resize(w, h) => {
                self.surface.resize(w as usize, h as usize);
                self.viewport.set_window(w as usize, h as usize);
                if self.mode == UiMode::Gallery {
                    self.layout.resize(w as usize, h as usize, self.list.len());
                    self.schedule_thumbs();
                }
                true
            }
            Event::Drag { dx, dy } => {
                if self.mode == UiMode::Viewer {
                    self.viewport.drag(dx as f64, dy as f64);
                    true
                } else {
                    false
                }
            }
            Event::Load { image, .. } => {
                // Completes a pending open; otherwise a preload or
                // thumbnail finished and only needs a repaint when visible.
                if self.pending_open.as_deref() == Some(image.source()) {
                    self.pending_open = None;
                    self.surface.set_cursor(CursorType::Normal);
                    if self.mode == UiMode::Viewer {
                        self.show(image);
                    }
                    return true;
                }
                match self.mode {
                    UiMode::Gallery => self.layout.visible().contains(&image.index()),
                    UiMode::Viewer => {
                        Some(image.source()) == self.viewport.image().map(|i| i.source())
                    }
                }
            }
            Event::LoadFailed { source, index } => {
                if self.pending_open.as_deref() == Some(source.as_str()) {
                    self.advance_past_failure(index);
                }
                false
            }
            Event::Activate { index } => {
                if self.mode == UiMode::Gallery {
                    self.layout.select_index(index, self.list.len());
                    self.leave_gallery()
                } else if let Some(entry) = self.list.get_index(index) {
                    self.open(entry);
                    true
                } else {
                    false
                }
            }
            Event::Action(seq) => {
                let mut dirty = false;
                for action in &seq {
                    dirty |= self.apply_action(action);
                    if self.quit.is_some() {
                        break;
                    }
                }
                dirty
            }
            Event::AnimationTick => {
                self.viewport.advance_frame();
                self.arm_animation();
                true
            }
            Event::SlideshowTick => {
                let moved = self.navigate(Pos::Next);
                self.arm_slideshow();
                moved
            }
            Event::ListAdded(image) => {
                debug!(target: "runtime", source = image.source(), "list grew");
                if self.mode == UiMode::Gallery {
                    self.layout.update(self.list.len());
                    self.schedule_thumbs();
                }
                self.update_title();
                self.mode == UiMode::Gallery
            }
            Event::ListRemoved(source) => {
                self.loader.evict(&source);
                let current_gone =
                    Some(source.as_str()) == self.viewport.image().map(|i| i.source());
                if current_gone {
                    self.viewport.clear_image();
                    self.anim_timer.cancel();
                    if let Some(first) = self.list.first() {
                        self.open(first);
                    } else {
                        self.quit = Some(0);
                    }
                }
                if self.mode == UiMode::Gallery {
                    self.layout.update(self.list.len());
                }
                self.update_title();
                true
            }
            Event::ListModified(image) => {
                let is_current =
                    Some(image.source()) == self.viewport.image().map(|i| i.source());
                if is_current {
                    self.reload_current();
                }
                is_current
            }
            Event::Shutdown => {
                self.quit = Some(0);
                false
            }
        }
    }

    pub(crate) fn apply_action(&mut self, action: &Action) -> bool {
        debug!(target: "runtime.action", action = %action, mode = ?self.mode, "dispatch");
        match self.mode {
            UiMode::Viewer => self.viewer_action(action),
            UiMode::Gallery => self.gallery_action(action),
        }
    }

    /// Drop the decoded state of the shown image and open it again (file
    /// rewritten, explicit reload action).
    pub(crate) fn reload_current(&mut self) {
        let Some(image) = self.viewport.image().cloned() else {
            return;
        };
        image.clear(Parts::ALL);
        image.reset_failures();
        self.open(image);
    }

    /// One paint pass.
    pub fn paint(&mut self) {
        match self.mode {
            UiMode::Viewer => {
                self.viewport
                    .draw(&self.renderer, self.surface.begin_draw());
            }
            UiMode::Gallery => self.draw_gallery(),
        }
        self.surface.commit();
    }

    pub fn quit_code(&self) -> Option<i32> {
        self.quit
    }

    /// Drive the loop until shutdown. Coalesces redraws: a drained batch of
    /// events produces at most one paint.
    pub async fn pump(&mut self, rx: &mut Receiver<Event>) -> i32 {
        self.paint();
        loop {
            let Some(event) = rx.recv().await else {
                return 0;
            };
            let mut dirty = self.handle_event(event);
            while let Ok(event) = rx.try_recv() {
                if dirty && matches!(event, Event::Redraw) {
                    REDRAWS_COALESCED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                dirty |= self.handle_event(event);
                if self.quit.is_some() {
                    break;
                }
            }
            if let Some(code) = self.quit {
                info!(target: "runtime", code, "shutdown");
                return code;
            }
            if dirty {
                self.paint();
            }
        }
    }
}
