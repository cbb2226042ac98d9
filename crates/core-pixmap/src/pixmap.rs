//! Drawing surface with clipped geometry primitives.
//!
//! Invariants:
//! * Storage is row-major and contiguous: pixel `(x, y)` lives at
//!   `data[y * width + x]`.
//! * Every primitive accepts signed coordinates and clips against
//!   `[0, width) x [0, height)`; no primitive reads or writes outside the
//!   buffer, and geometry primitives cannot fail.
//! * Only allocation can fail (`new`, `from_vec`, rotation by 90/270). A
//!   failed allocation leaves the pixmap untouched.

use crate::color::Color;
use thiserror::Error;

/// Whether the alpha byte participates when this pixmap is composited onto
/// another. `Xrgb` sources are copied opaque; `Argb` sources are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    Argb,
    #[default]
    Xrgb,
}

/// Quarter-turn rotations understood by [`Pixmap::rotate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Debug, Error)]
pub enum PixmapError {
    #[error("failed to allocate {width}x{height} pixmap buffer")]
    Alloc { width: usize, height: usize },
    #[error("buffer length {len} does not match {width}x{height}")]
    Size {
        width: usize,
        height: usize,
        len: usize,
    },
}

/// Clipped region in destination coordinates, half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clip {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// Owned ARGB pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<Color>,
}

impl Pixmap {
    /// Allocate a zero-filled (fully transparent) pixmap.
    pub fn new(format: PixelFormat, width: usize, height: usize) -> Result<Self, PixmapError> {
        let len = width
            .checked_mul(height)
            .ok_or(PixmapError::Alloc { width, height })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PixmapError::Alloc { width, height })?;
        data.resize(len, Color::TRANSPARENT);
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Wrap an existing buffer. The buffer length must match the dimensions.
    pub fn from_vec(
        format: PixelFormat,
        width: usize,
        height: usize,
        data: Vec<Color>,
    ) -> Result<Self, PixmapError> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(PixmapError::Size {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Retag the pixmap. Decoders call this once they know whether any pixel
    /// carries meaningful alpha.
    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    #[inline]
    pub fn data(&self) -> &[Color] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [Color] {
        &mut self.data
    }

    /// Bounds-checked pixel read.
    #[inline]
    pub fn get(&self, x: isize, y: isize) -> Option<Color> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width + x as usize])
    }

    /// Unchecked-by-contract pixel read for in-bounds coordinates.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[Color] {
        debug_assert!(y < self.height);
        &self.data[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [Color] {
        debug_assert!(y < self.height);
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    /// Intersect a signed region with the pixmap bounds.
    fn clip(&self, x: isize, y: isize, w: usize, h: usize) -> Option<Clip> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x1 = x.saturating_add_unsigned(w).min(self.width as isize);
        let y1 = y.saturating_add_unsigned(h).min(self.height as isize);
        let x0 = x.max(0);
        let y0 = y.max(0);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Clip {
            x0: x0 as usize,
            y0: y0 as usize,
            x1: x1 as usize,
            y1: y1 as usize,
        })
    }

    /// Overwrite a region with `color`.
    pub fn fill(&mut self, x: isize, y: isize, w: usize, h: usize, color: Color) {
        let Some(c) = self.clip(x, y, w, h) else {
            return;
        };
        for row in c.y0..c.y1 {
            self.row_mut(row)[c.x0..c.x1].fill(color);
        }
    }

    /// Overwrite everything *except* the region with `color`.
    pub fn inverse_fill(&mut self, x: isize, y: isize, w: usize, h: usize, color: Color) {
        let Some(c) = self.clip(x, y, w, h) else {
            let (fw, fh) = (self.width, self.height);
            self.fill(0, 0, fw, fh, color);
            return;
        };
        for row in 0..c.y0 {
            self.row_mut(row).fill(color);
        }
        for row in c.y1..self.height {
            self.row_mut(row).fill(color);
        }
        for row in c.y0..c.y1 {
            let line = self.row_mut(row);
            line[..c.x0].fill(color);
            line[c.x1..].fill(color);
        }
    }

    /// Alpha-blend `color` over every pixel of the region.
    pub fn blend(&mut self, x: isize, y: isize, w: usize, h: usize, color: Color) {
        let Some(c) = self.clip(x, y, w, h) else {
            return;
        };
        for row in c.y0..c.y1 {
            for px in &mut self.row_mut(row)[c.x0..c.x1] {
                *px = color.blend_over(*px);
            }
        }
    }

    /// Horizontal line of `len` pixels; `thickness` grows downward.
    pub fn hline(&mut self, x: isize, y: isize, len: usize, thickness: usize, color: Color) {
        self.fill(x, y, len, thickness, color);
    }

    /// Vertical line of `len` pixels; `thickness` grows rightward.
    pub fn vline(&mut self, x: isize, y: isize, len: usize, thickness: usize, color: Color) {
        self.fill(x, y, thickness, len, color);
    }

    /// Rectangle outline around the region `(x, y, w, h)`; `thickness` grows
    /// outward from the region edge.
    pub fn rect(&mut self, x: isize, y: isize, w: usize, h: usize, thickness: usize, color: Color) {
        let t = thickness as isize;
        let ow = w + 2 * thickness;
        self.fill(x - t, y - t, ow, thickness, color);
        self.fill(x - t, y.saturating_add_unsigned(h), ow, thickness, color);
        self.fill(x - t, y, thickness, h, color);
        self.fill(x.saturating_add_unsigned(w), y, thickness, h, color);
    }

    /// Checkerboard used for transparency visualization. The tile containing
    /// the grid origin gets `c0`.
    pub fn grid(
        &mut self,
        x: isize,
        y: isize,
        w: usize,
        h: usize,
        tile: usize,
        c0: Color,
        c1: Color,
    ) {
        if tile == 0 {
            return;
        }
        let Some(c) = self.clip(x, y, w, h) else {
            return;
        };
        for row in c.y0..c.y1 {
            let ty = (row as isize - y) as usize / tile;
            let line = self.row_mut(row);
            for col in c.x0..c.x1 {
                let tx = (col as isize - x) as usize / tile;
                line[col] = if (tx + ty) % 2 == 0 { c0 } else { c1 };
            }
        }
    }

    /// Blend `color` over the region, per-pixel scaled by the mask byte
    /// (`m / 255`). Used to composite rasterized glyphs.
    pub fn apply_mask(
        &mut self,
        x: isize,
        y: isize,
        mask: &[u8],
        mask_w: usize,
        mask_h: usize,
        color: Color,
    ) {
        debug_assert!(mask.len() >= mask_w * mask_h);
        let Some(c) = self.clip(x, y, mask_w, mask_h) else {
            return;
        };
        for row in c.y0..c.y1 {
            let my = (row as isize - y) as usize;
            let line = self.row_mut(row);
            for col in c.x0..c.x1 {
                let mx = (col as isize - x) as usize;
                let m = mask[my * mask_w + mx];
                if m != 0 {
                    line[col] = color.blend_weighted(line[col], m);
                }
            }
        }
    }

    /// Draw `src` with its top-left at `(x, y)`. `argb` sources blend per
    /// pixel; anything else is a plain row copy.
    pub fn copy_from(&mut self, src: &Pixmap, x: isize, y: isize) {
        let Some(c) = self.clip(x, y, src.width, src.height) else {
            return;
        };
        match src.format {
            PixelFormat::Argb => {
                for row in c.y0..c.y1 {
                    let sy = (row as isize - y) as usize;
                    let sx0 = (c.x0 as isize - x) as usize;
                    let src_row = &src.row(sy)[sx0..sx0 + (c.x1 - c.x0)];
                    let dst_row = &mut self.data[row * self.width + c.x0..row * self.width + c.x1];
                    for (d, s) in dst_row.iter_mut().zip(src_row) {
                        *d = s.blend_over(*d);
                    }
                }
            }
            PixelFormat::Xrgb => {
                for row in c.y0..c.y1 {
                    let sy = (row as isize - y) as usize;
                    let sx0 = (c.x0 as isize - x) as usize;
                    let src_row = &src.row(sy)[sx0..sx0 + (c.x1 - c.x0)];
                    self.data[row * self.width + c.x0..row * self.width + c.x1]
                        .copy_from_slice(src_row);
                }
            }
        }
    }

    /// Mirror rows top-to-bottom, in place.
    pub fn flip_vertical(&mut self) {
        let (w, h) = (self.width, self.height);
        for y in 0..h / 2 {
            let (top, rest) = self.data.split_at_mut((h - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut rest[..w]);
        }
    }

    /// Mirror columns left-to-right, in place.
    pub fn flip_horizontal(&mut self) {
        for y in 0..self.height {
            self.row_mut(y).reverse();
        }
    }

    /// Rotate by a quarter turn. 180 degrees is in place; 90/270 allocate a
    /// new buffer and swap dimensions. On allocation failure the pixmap is
    /// left unchanged.
    pub fn rotate(&mut self, rotation: Rotation) -> Result<(), PixmapError> {
        match rotation {
            Rotation::Deg180 => {
                self.data.reverse();
                Ok(())
            }
            Rotation::Deg90 | Rotation::Deg270 => {
                let (w, h) = (self.width, self.height);
                let mut out = Vec::new();
                out.try_reserve_exact(w * h)
                    .map_err(|_| PixmapError::Alloc {
                        width: h,
                        height: w,
                    })?;
                out.resize(w * h, Color::TRANSPARENT);
                for sy in 0..h {
                    for sx in 0..w {
                        let (dx, dy) = match rotation {
                            Rotation::Deg90 => (h - 1 - sy, sx),
                            Rotation::Deg270 => (sy, w - 1 - sx),
                            Rotation::Deg180 => unreachable!(),
                        };
                        out[dy * h + dx] = self.data[sy * w + sx];
                    }
                }
                self.data = out;
                self.width = h;
                self.height = w;
                Ok(())
            }
        }
    }
}
