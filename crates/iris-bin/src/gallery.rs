//! Gallery mode: thumbnail grid drawing, selection, and thumbnail jobs.

use crate::app::{App, UiMode};
use crate::winsys::Surface;
use core_actions::{Action, ActionKind};
use core_events::Event;
use core_image::{Parts, ThumbParams};
use core_layout::SelectMove;
use core_pixmap::{Color, PixelFormat};
use core_render::Renderer;
use core_viewport::TransparencyBg;
use std::sync::Arc;
use tracing::{debug, warn};

/// Off-screen thumbnails produced ahead of scrolling.
const THUMB_PRELOAD: usize = 8;
/// Entries kept around the visible window before eviction.
const THUMB_PRESERVE_PAGES: usize = 2;

const CELL_BG: Color = Color(0xff26_2626);
const SELECT_BORDER: Color = Color(0xff4f_9cf9);

impl App {
    /// Switch to the thumbnail grid, keeping the current selection.
    /// Outstanding preloads are canceled and drained first.
    pub fn enter_gallery(&mut self) -> bool {
        let index = self.current_index();
        self.mode = UiMode::Gallery;
        self.anim_timer.cancel();
        self.slide_timer.cancel();
        self.loader.reset();
        self.layout
            .resize(self.surface.width(), self.surface.height(), self.list.len());
        self.layout.select_index(index, self.list.len());
        self.schedule_thumbs();
        self.update_title();
        true
    }

    /// Back to the viewer, opening the selected entry.
    pub(crate) fn leave_gallery(&mut self) -> bool {
        self.mode = UiMode::Viewer;
        if let Some(entry) = self.list.get_index(self.layout.current()) {
            self.open(entry);
        }
        true
    }

    pub(crate) fn gallery_action(&mut self, action: &Action) -> bool {
        let total = self.list.len();
        let moved = match action.kind {
            ActionKind::StepLeft | ActionKind::PrevFile => {
                self.layout.select(SelectMove::Left, total)
            }
            ActionKind::StepRight | ActionKind::NextFile => {
                self.layout.select(SelectMove::Right, total)
            }
            ActionKind::StepUp => self.layout.select(SelectMove::Up, total),
            ActionKind::StepDown => self.layout.select(SelectMove::Down, total),
            ActionKind::PageUp => self.layout.select(SelectMove::PageUp, total),
            ActionKind::PageDown => self.layout.select(SelectMove::PageDown, total),
            ActionKind::FirstFile => self.layout.select(SelectMove::First, total),
            ActionKind::LastFile => self.layout.select(SelectMove::Last, total),
            ActionKind::Mode => return self.leave_gallery(),
            ActionKind::SkipFile => {
                let Some(entry) = self.list.get_index(self.layout.current()) else {
                    return false;
                };
                self.list.remove(entry.source(), true);
                self.loader.evict(entry.source());
                self.layout.update(self.list.len());
                if self.list.is_empty() {
                    self.quit = Some(0);
                    return false;
                }
                true
            }
            ActionKind::Reload => {
                if let Some(entry) = self.list.get_index(self.layout.current()) {
                    entry.clear(Parts::THUMBNAIL);
                    entry.reset_failures();
                }
                true
            }
            ActionKind::Fullscreen => {
                self.fullscreen = !self.fullscreen;
                return false;
            }
            ActionKind::Exit => {
                self.quit = Some(0);
                return false;
            }
            ActionKind::Help | ActionKind::None => return false,
            _ => return false,
        };
        if moved {
            self.schedule_thumbs();
            self.evict_thumbs();
            self.update_title();
        }
        moved
    }

    /// Queue thumbnail production for visible-missing entries (selection
    /// outward) plus a margin, on the worker pool.
    pub(crate) fn schedule_thumbs(&mut self) {
        let list = Arc::clone(&self.list);
        let queue = self.layout.load_queue(THUMB_PRELOAD, |index| {
            list.get_index(index).map(|e| e.has_thumbnail()).unwrap_or(true)
        });
        if queue.is_empty() {
            return;
        }
        debug!(target: "runtime.gallery", pending = queue.len(), "scheduling thumbnails");

        let params = self.thumb_params();
        for index in queue {
            let Some(entry) = self.list.get_index(index) else {
                continue;
            };
            if entry.is_skipped() {
                continue;
            }
            let tx = self.tx.clone();
            let registry = Arc::clone(&self.registry);
            let loader = Arc::clone(&self.loader);
            let thumbs_dir = self.thumbs_dir.clone();
            let params = params.clone();
            let (size, fill, filter, bg, budget) = (
                self.settings.thumb_size,
                self.settings.thumb_fill,
                self.settings.thumb_aa,
                match self.settings.viewport.transparent_bg {
                    TransparencyBg::Color(c) => c,
                    TransparencyBg::Grid => Color::BLACK,
                },
                self.settings.thumb_cache_mb * 1024 * 1024,
            );
            self.worker_pool.add(move || {
                if entry.has_thumbnail() {
                    return;
                }
                // Disk cache first.
                if let Some(dir) = &thumbs_dir
                    && let Ok(Some(pm)) =
                        core_image::load_thumbnail(dir, entry.source(), &params, PixelFormat::Argb)
                {
                    entry.lock_data().thumbnail = Some(pm);
                } else {
                    let had_frames = entry.has_frames();
                    if !had_frames && registry.load(&entry).is_err() {
                        entry.record_failure();
                        return;
                    }
                    let renderer = Renderer::single_threaded();
                    if let Err(e) = entry.make_thumbnail(&renderer, size, fill, filter, bg) {
                        warn!(target: "runtime.gallery", source = entry.source(), error = %e, "thumbnail failed");
                        return;
                    }
                    if let Some(dir) = &thumbs_dir {
                        let data = entry.lock_data();
                        if let Some(thumb) = &data.thumbnail {
                            if let Err(e) =
                                core_image::save_thumbnail(dir, entry.source(), thumb, &params)
                            {
                                warn!(target: "runtime.gallery", error = %e, "thumbnail cache write failed");
                            }
                        }
                        drop(data);
                        core_image::prune(dir, budget);
                    }
                    // Gallery only needs the thumbnail; keep frames only for
                    // entries a cache still owns.
                    if !had_frames
                        && !loader.preload().contains(entry.source())
                        && !loader.history().contains(entry.source())
                    {
                        entry.clear(Parts::FRAMES);
                    }
                }
                let index = entry.index();
                let _ = tx.blocking_send(Event::Load {
                    image: entry,
                    index,
                });
            });
        }
    }

    pub(crate) fn thumb_params(&self) -> ThumbParams {
        ThumbParams {
            width: self.settings.thumb_size as u32,
            height: self.settings.thumb_size as u32,
            offset_x: 0,
            offset_y: 0,
            fill: self.settings.thumb_fill,
            antialias: self.settings.thumb_aa.name().to_string(),
            scale: 1.0,
        }
    }

    /// Free thumbnails far outside the visible window.
    pub(crate) fn evict_thumbs(&mut self) {
        let preserve = THUMB_PRESERVE_PAGES * self.layout.columns() * self.layout.rows();
        for index in self.layout.evictable(preserve) {
            if let Some(entry) = self.list.get_index(index)
                && entry.has_thumbnail()
            {
                entry.clear(Parts::THUMBNAIL);
            }
        }
    }

    /// Paint the grid: thumbnails where present, placeholders elsewhere,
    /// selection border on the current cell.
    pub(crate) fn draw_gallery(&mut self) {
        let entries: Vec<_> = self
            .layout
            .visible()
            .filter_map(|i| self.list.get_index(i).map(|e| (i, e)))
            .collect();
        let current = self.layout.current();
        let window_bg = self.settings.viewport.window_bg;
        let thumb_size = self.layout.thumb_size();
        let rects: Vec<_> = entries
            .iter()
            .map(|(i, _)| self.layout.cell_rect(*i))
            .collect();

        let frame = self.surface.begin_draw();
        let (w, h) = (frame.width(), frame.height());
        frame.fill(0, 0, w, h, window_bg);

        for ((index, entry), rect) in entries.into_iter().zip(rects) {
            let Some(rect) = rect else { continue };
            frame.fill(rect.x, rect.y, rect.size, rect.size, CELL_BG);
            let data = entry.lock_data();
            if let Some(thumb) = &data.thumbnail {
                // Center fit-mode thumbnails inside the square cell.
                let dx = rect.x + (thumb_size as isize - thumb.width() as isize) / 2;
                let dy = rect.y + (thumb_size as isize - thumb.height() as isize) / 2;
                frame.copy_from(thumb, dx, dy);
            }
            drop(data);
            if index == current {
                frame.rect(rect.x, rect.y, rect.size, rect.size, 2, SELECT_BORDER);
            }
        }
    }
}
