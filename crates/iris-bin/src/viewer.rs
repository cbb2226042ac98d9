//! Single-image mode: action handling.

use crate::app::App;
use core_actions::{Action, ActionKind};
use core_list::Pos;
use core_pixmap::Rotation;
use core_render::Filter;
use core_viewport::{MoveDir, ScaleMode};
use tracing::{info, warn};

/// Default pan step as a percentage of the window dimension.
const DEFAULT_STEP_PCT: f64 = 10.0;
/// Default zoom step in percent.
const DEFAULT_ZOOM_PCT: f64 = 10.0;

impl App {
    pub(crate) fn viewer_action(&mut self, action: &Action) -> bool {
        match action.kind {
            ActionKind::FirstFile => self.navigate(Pos::First),
            ActionKind::LastFile => self.navigate(Pos::Last),
            ActionKind::PrevFile => self.navigate(Pos::Prev),
            ActionKind::NextFile => self.navigate(Pos::Next),
            ActionKind::PrevDir => self.navigate(Pos::PrevParent),
            ActionKind::NextDir => self.navigate(Pos::NextParent),
            ActionKind::RandFile => self.navigate(Pos::Random),
            ActionKind::SkipFile => {
                // Positional jump when a distance is given, else drop the
                // current entry from the list.
                if let Some(distance) = action.param_isize() {
                    let from = self.current_index();
                    if let Some(target) = self.list.get_distance(from, distance) {
                        self.open(target);
                        return true;
                    }
                    return false;
                }
                self.skip_current()
            }
            ActionKind::PrevFrame => {
                self.anim_timer.cancel();
                self.viewport.select_frame(false);
                true
            }
            ActionKind::NextFrame => {
                self.anim_timer.cancel();
                self.viewport.select_frame(true);
                true
            }
            ActionKind::Animation => {
                let run = !self.viewport.animating();
                self.viewport.animation_ctl(run);
                if run {
                    self.arm_animation();
                } else {
                    self.anim_timer.cancel();
                }
                true
            }
            ActionKind::Slideshow => {
                self.slideshow_on = !self.slideshow_on;
                info!(target: "runtime", on = self.slideshow_on, "slideshow");
                self.arm_slideshow();
                false
            }
            ActionKind::Fullscreen => {
                self.fullscreen = !self.fullscreen;
                false
            }
            ActionKind::Mode => self.enter_gallery(),
            ActionKind::StepLeft => self.step(MoveDir::Left, action),
            ActionKind::StepRight => self.step(MoveDir::Right, action),
            ActionKind::StepUp => self.step(MoveDir::Up, action),
            ActionKind::StepDown => self.step(MoveDir::Down, action),
            ActionKind::PageUp => {
                self.viewport.page(MoveDir::Up);
                true
            }
            ActionKind::PageDown => {
                self.viewport.page(MoveDir::Down);
                true
            }
            ActionKind::Zoom => {
                let pct = action.param_f64().unwrap_or(DEFAULT_ZOOM_PCT);
                self.viewport.zoom(1.0 + pct / 100.0);
                true
            }
            ActionKind::Scale => {
                match action.param.parse::<ScaleMode>() {
                    Ok(mode) => self.viewport.set_scale_mode(mode),
                    Err(()) if action.param.is_empty() => self.cycle_scale_mode(),
                    Err(()) => {
                        // A bare number is an absolute percentage.
                        match action.param_f64() {
                            Some(pct) if pct > 0.0 => {
                                let (w, h) = self.viewport.window();
                                self.viewport.set_scale_abs(
                                    pct / 100.0,
                                    w as f64 / 2.0,
                                    h as f64 / 2.0,
                                );
                            }
                            _ => {
                                warn!(target: "runtime", param = action.param.as_str(), "unknown scale mode");
                                return false;
                            }
                        }
                    }
                }
                true
            }
            ActionKind::KeepZoom => {
                let def = if self.viewport.default_scale() == ScaleMode::KeepZoom {
                    self.settings.viewport.scale_mode
                } else {
                    ScaleMode::KeepZoom
                };
                self.viewport.set_default_scale(def);
                info!(target: "runtime", keep = def == ScaleMode::KeepZoom, "keep_zoom");
                false
            }
            ActionKind::RotateLeft => self.rotate(Rotation::Deg270),
            ActionKind::RotateRight => self.rotate(Rotation::Deg90),
            ActionKind::FlipVertical => self.flip(true),
            ActionKind::FlipHorizontal => self.flip(false),
            ActionKind::Reload => {
                self.reload_current();
                true
            }
            ActionKind::Antialiasing => {
                if action.param.is_empty() {
                    self.viewport.toggle_aa();
                } else {
                    match action.param.parse::<Filter>() {
                        Ok(filter) => self.viewport.set_aa(filter),
                        Err(()) => {
                            warn!(target: "runtime", param = action.param.as_str(), "unknown filter");
                            return false;
                        }
                    }
                }
                true
            }
            ActionKind::Info => {
                self.info_visible = !self.info_visible;
                self.update_title();
                true
            }
            ActionKind::Exec => self.exec_command(&action.param),
            ActionKind::Export => self.export_current(&action.param),
            ActionKind::Status => {
                self.update_title();
                false
            }
            ActionKind::Exit => {
                self.quit = Some(0);
                false
            }
            ActionKind::Help | ActionKind::None => false,
        }
    }

    fn step(&mut self, dir: MoveDir, action: &Action) -> bool {
        let pct = action.param_f64().unwrap_or(DEFAULT_STEP_PCT);
        let (w, h) = self.viewport.window();
        let px = match dir {
            MoveDir::Left | MoveDir::Right => w as f64 * pct / 100.0,
            MoveDir::Up | MoveDir::Down => h as f64 * pct / 100.0,
        };
        self.viewport.step(dir, px);
        true
    }

    fn cycle_scale_mode(&mut self) {
        let modes = [
            ScaleMode::FitOptimal,
            ScaleMode::FitWindow,
            ScaleMode::FitWidth,
            ScaleMode::FitHeight,
            ScaleMode::FillWindow,
            ScaleMode::RealSize,
        ];
        let at = modes
            .iter()
            .position(|m| *m == self.viewport.scale_mode())
            .unwrap_or(modes.len() - 1);
        self.viewport.set_scale_mode(modes[(at + 1) % modes.len()]);
    }

    /// Drop the current entry from the list and advance.
    pub(crate) fn skip_current(&mut self) -> bool {
        let Some(current) = self.viewport.image().cloned() else {
            return false;
        };
        let neighbor = self.list.remove(current.source(), true);
        self.loader.evict(current.source());
        self.viewport.clear_image();
        self.anim_timer.cancel();
        match neighbor {
            Some(next) => {
                self.open(next);
                true
            }
            None => {
                self.quit = Some(0);
                false
            }
        }
    }

    fn rotate(&mut self, rotation: Rotation) -> bool {
        let Some(image) = self.viewport.image().cloned() else {
            return false;
        };
        if let Err(e) = image.rotate(rotation) {
            warn!(target: "runtime", source = image.source(), error = %e, "rotate failed");
            return false;
        }
        self.viewport.on_image_transformed();
        true
    }

    fn flip(&mut self, vertical: bool) -> bool {
        let Some(image) = self.viewport.image().cloned() else {
            return false;
        };
        image.flip(vertical);
        self.viewport.on_image_transformed();
        true
    }

    /// Run a shell command; `%` expands to the current source path.
    fn exec_command(&mut self, template: &str) -> bool {
        let Some(image) = self.viewport.image().cloned() else {
            return false;
        };
        let cmd = template.replace('%', image.source());
        match std::process::Command::new("sh").arg("-c").arg(&cmd).status() {
            Ok(status) => {
                info!(target: "runtime", cmd = cmd.as_str(), code = status.code(), "exec finished");
                // The command may have rewritten the file.
                self.reload_current();
                true
            }
            Err(e) => {
                warn!(target: "runtime", cmd = cmd.as_str(), error = %e, "exec failed");
                false
            }
        }
    }

    /// Export the currently shown frame as PNG.
    fn export_current(&mut self, path: &str) -> bool {
        let Some(image) = self.viewport.image().cloned() else {
            return false;
        };
        let path = if path.is_empty() { "export.png" } else { path };
        let frame = self.viewport.frame();
        let data = image.lock_data();
        let Some(frame) = data.frames.get(frame) else {
            return false;
        };
        match core_image::export_png(&frame.pixmap, std::path::Path::new(path)) {
            Ok(()) => {
                info!(target: "runtime", path, "frame exported");
                false
            }
            Err(e) => {
                warn!(target: "runtime", path, error = %e, "export failed");
                false
            }
        }
    }
}
