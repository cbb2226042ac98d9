//! Window-surface seam.
//!
//! The render core only needs a mutable ARGB buffer of known dimensions, a
//! title setter, a cursor-type setter, and a commit signal; any windowing
//! backend that provides those can host the viewer. [`SoftSurface`] is the
//! in-process implementation used by the runtime and the tests.

use core_pixmap::{PixelFormat, Pixmap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorType {
    #[default]
    Normal,
    Busy,
}

/// What the compositing pipeline requires from a window backend.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Borrow the ARGB buffer for one paint pass.
    fn begin_draw(&mut self) -> &mut Pixmap;
    /// Flush the buffer painted since `begin_draw`.
    fn commit(&mut self);
    fn set_title(&mut self, title: &str);
    fn set_cursor(&mut self, cursor: CursorType);
}

/// Software surface: a plain pixmap plus the observable side effects the
/// runtime produces (title, cursor, commit count).
pub struct SoftSurface {
    buffer: Pixmap,
    title: String,
    cursor: CursorType,
    commits: u64,
}

impl SoftSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: Pixmap::new(PixelFormat::Xrgb, width, height)
                .expect("window surface allocation"),
            title: String::new(),
            cursor: CursorType::Normal,
            commits: 0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.buffer.width() && height == self.buffer.height() {
            return;
        }
        self.buffer =
            Pixmap::new(PixelFormat::Xrgb, width, height).expect("window surface allocation");
    }

    /// Committed frame contents (inspection).
    pub fn frame(&self) -> &Pixmap {
        &self.buffer
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cursor(&self) -> CursorType {
        self.cursor
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl Surface for SoftSurface {
    fn width(&self) -> usize {
        self.buffer.width()
    }

    fn height(&self) -> usize {
        self.buffer.height()
    }

    fn begin_draw(&mut self) -> &mut Pixmap {
        &mut self.buffer
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_cursor(&mut self, cursor: CursorType) {
        self.cursor = cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_pixmap::Color;

    #[test]
    fn draw_commit_cycle() {
        let mut surface = SoftSurface::new(4, 4);
        let buf = surface.begin_draw();
        buf.fill(0, 0, 4, 4, Color::WHITE);
        surface.commit();
        assert_eq!(surface.commits(), 1);
        assert_eq!(surface.frame().pixel(3, 3), Color::WHITE);
    }

    #[test]
    fn resize_reallocates_only_on_change() {
        let mut surface = SoftSurface::new(4, 4);
        surface.begin_draw().fill(0, 0, 4, 4, Color::WHITE);
        surface.resize(4, 4);
        assert_eq!(surface.frame().pixel(0, 0), Color::WHITE);
        surface.resize(8, 2);
        assert_eq!((surface.width(), surface.height()), (8, 2));
        assert_eq!(surface.frame().pixel(0, 0), Color::TRANSPARENT);
    }
}
