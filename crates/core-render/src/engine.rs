//! Scaled pixmap composition: nearest-neighbor and two-pass convolution.
//!
//! `render` paints `src` scaled by `scale` with its top-left at `(x, y)` in
//! destination coordinates. Contributions outside the destination are
//! clipped; an empty clip is a no-op. `argb` sources blend per pixel, other
//! sources overwrite opaque (matching the copy primitive's contract).
//!
//! Convolution runs as two 1-D passes through an intermediate buffer sized
//! `(clip_width, vertical_support)`: pass 1 resamples the source rows the
//! vertical kernel will touch, pass 2 resamples columns into the
//! destination. In the alpha branch each channel accumulates `w * alpha * c`
//! and is divided by the summed `w * alpha`, so fully transparent inputs do
//! not darken their neighbors.
//!
//! With `multithreaded` set and a clip of at least [`MT_MIN_AREA`] pixels,
//! rows are partitioned into disjoint bands across the pool workers plus the
//! calling thread, with a barrier between the passes. The banded path runs
//! the same per-pixel code as the serial path, so both produce bitwise
//! identical output.

use crate::filter::Filter;
use crate::kernel::{FIXED_BITS, Kernel};
use crate::worker::{DoneLatch, PassBarrier, RawRows, band};
use core_pixmap::{Color, PixelFormat, Pixmap};
use core_pool::ThreadPool;
use std::sync::Arc;
use tracing::{error, trace};

/// Destination clip area (pixels) below which the synchronization cost of
/// parallel rendering outweighs the work.
pub const MT_MIN_AREA: usize = 100_000;

/// Destination clip and its offset inside the scaled output space.
#[derive(Debug, Clone, Copy)]
struct ClipBox {
    dx0: usize,
    dy0: usize,
    out_w: usize,
    out_h: usize,
    /// Scaled-output columns/rows clipped off before the window.
    off_x: usize,
    off_y: usize,
}

fn clip_dest(src: &Pixmap, dst: &Pixmap, x: isize, y: isize, scale: f64) -> Option<ClipBox> {
    let scaled_w = ((src.width() as f64 * scale) as isize).max(1);
    let scaled_h = ((src.height() as f64 * scale) as isize).max(1);
    let dx0 = x.max(0);
    let dy0 = y.max(0);
    let dx1 = x.saturating_add(scaled_w).min(dst.width() as isize);
    let dy1 = y.saturating_add(scaled_h).min(dst.height() as isize);
    if dx0 >= dx1 || dy0 >= dy1 {
        return None;
    }
    Some(ClipBox {
        dx0: dx0 as usize,
        dy0: dy0 as usize,
        out_w: (dx1 - dx0) as usize,
        out_h: (dy1 - dy0) as usize,
        off_x: (dx0 - x) as usize,
        off_y: (dy0 - y) as usize,
    })
}

/// Software scaler with an optional worker pool for banded parallelism.
pub struct Renderer {
    pool: Option<Arc<ThreadPool>>,
    workers: usize,
}

impl Renderer {
    /// Renderer backed by `pool`. Uses `min(16, max(1, cpus)) - 1` workers,
    /// capped by the pool size; the calling thread always participates too.
    pub fn new(pool: Arc<ThreadPool>) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let workers = (cpus.clamp(1, 16) - 1).min(pool.threads());
        Self {
            pool: Some(pool),
            workers,
        }
    }

    /// Renderer that always runs on the calling thread.
    pub fn single_threaded() -> Self {
        Self {
            pool: None,
            workers: 0,
        }
    }

    fn participants(&self, multithreaded: bool, area: usize) -> usize {
        if multithreaded && self.workers > 0 && self.pool.is_some() && area >= MT_MIN_AREA {
            self.workers + 1
        } else {
            1
        }
    }

    /// Paint `src` scaled by `scale` at `(x, y)` in `dst`.
    pub fn render(
        &self,
        src: &Pixmap,
        dst: &mut Pixmap,
        x: isize,
        y: isize,
        scale: f64,
        filter: Filter,
        multithreaded: bool,
    ) {
        if !(scale > 0.0) || src.width() == 0 || src.height() == 0 {
            return;
        }
        let Some(clip) = clip_dest(src, dst, x, y, scale) else {
            return;
        };
        let participants = self.participants(multithreaded, clip.out_w * clip.out_h);
        trace!(
            target: "render",
            filter = %filter,
            scale,
            out_w = clip.out_w,
            out_h = clip.out_h,
            participants,
            "render"
        );
        if filter.is_kernel() {
            self.render_kernel(src, dst, x, y, scale, filter, clip, participants);
        } else {
            self.render_nearest(src, dst, scale, clip, participants);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_kernel(
        &self,
        src: &Pixmap,
        dst: &mut Pixmap,
        _x: isize,
        _y: isize,
        scale: f64,
        filter: Filter,
        clip: ClipBox,
        participants: usize,
    ) {
        let hk = Kernel::build(filter, src.width(), clip.off_x, clip.out_w, scale);
        let vk = Kernel::build(filter, src.height(), clip.off_y, clip.out_h, scale);
        let mut mid = match Pixmap::new(src.format(), clip.out_w, vk.support()) {
            Ok(p) => p,
            Err(e) => {
                error!(target: "render", %e, "intermediate buffer allocation failed");
                return;
            }
        };

        let dst_w = dst.width();
        let dst_h = dst.height();
        let shared = Arc::new(ConvShared {
            src: RawRows::readonly(src.data(), src.width(), src.height()),
            mid: RawRows::new(mid.data_mut(), clip.out_w, vk.support()),
            dst: RawRows::new(dst.data_mut(), dst_w, dst_h),
            hk,
            vk,
            clip,
            src_argb: src.format() == PixelFormat::Argb,
            barrier: PassBarrier::new(participants),
            done: DoneLatch::new(participants - 1),
        });

        if let Some(pool) = &self.pool {
            for idx in 0..participants - 1 {
                let sh = Arc::clone(&shared);
                pool.add(move || {
                    conv_participant(&sh, idx, participants);
                    sh.done.arrive();
                });
            }
        }
        conv_participant(&shared, participants - 1, participants);
        // `mid`, `src` and `dst` stay borrowed until every worker is done.
        shared.done.wait();
    }

    fn render_nearest(
        &self,
        src: &Pixmap,
        dst: &mut Pixmap,
        scale: f64,
        clip: ClipBox,
        participants: usize,
    ) {
        // Fixed-point reciprocal: 32 fraction bits on upscale for full
        // precision, 25 on downscale so extreme reductions of very large
        // sources cannot overflow the multiply.
        let bits: u32 = if scale >= 1.0 { 32 } else { 25 };
        let num: u64 = ((1u64 << bits) as f64 / scale) as u64;

        let dst_w = dst.width();
        let dst_h = dst.height();
        let shared = Arc::new(NearestShared {
            src: RawRows::readonly(src.data(), src.width(), src.height()),
            dst: RawRows::new(dst.data_mut(), dst_w, dst_h),
            src_argb: src.format() == PixelFormat::Argb,
            num,
            bits,
            clip,
            done: DoneLatch::new(participants - 1),
        });

        if let Some(pool) = &self.pool {
            for idx in 0..participants - 1 {
                let sh = Arc::clone(&shared);
                pool.add(move || {
                    nearest_band(&sh, idx, participants);
                    sh.done.arrive();
                });
            }
        }
        nearest_band(&shared, participants - 1, participants);
        shared.done.wait();
    }
}

struct NearestShared {
    src: RawRows,
    dst: RawRows,
    src_argb: bool,
    num: u64,
    bits: u32,
    clip: ClipBox,
    done: DoneLatch,
}

fn nearest_band(sh: &NearestShared, idx: usize, total: usize) {
    let (r0, r1) = band(sh.clip.out_h, idx, total);
    let (src_w, src_h) = (sh.src.width(), sh.src.height());
    for row in r0..r1 {
        let sy = ((((sh.clip.off_y + row) as u64) * sh.num) >> sh.bits) as usize;
        let src_row = unsafe { sh.src.row(sy.min(src_h - 1)) };
        let dst_row = unsafe { sh.dst.row_mut(sh.clip.dy0 + row) };
        for col in 0..sh.clip.out_w {
            let sx = ((((sh.clip.off_x + col) as u64) * sh.num) >> sh.bits) as usize;
            let px = src_row[sx.min(src_w - 1)];
            let d = &mut dst_row[sh.clip.dx0 + col];
            *d = if sh.src_argb {
                px.blend_over(*d)
            } else {
                px.opaque()
            };
        }
    }
}

struct ConvShared {
    src: RawRows,
    mid: RawRows,
    dst: RawRows,
    hk: Kernel,
    vk: Kernel,
    clip: ClipBox,
    src_argb: bool,
    barrier: PassBarrier,
    done: DoneLatch,
}

fn conv_participant(sh: &ConvShared, idx: usize, total: usize) {
    let (m0, m1) = band(sh.mid.height(), idx, total);
    for row in m0..m1 {
        hpass_row(sh, row);
    }
    // All of the intermediate band must exist before any column resample
    // reads across it.
    sh.barrier.wait();
    let (o0, o1) = band(sh.clip.out_h, idx, total);
    for row in o0..o1 {
        vpass_row(sh, row);
    }
}

/// Pass 1: horizontal resample of one source row into the intermediate.
fn hpass_row(sh: &ConvShared, mid_row: usize) {
    let sy = sh.vk.min_input() + mid_row;
    let src_row = unsafe { sh.src.row(sy) };
    let out = unsafe { sh.mid.row_mut(mid_row) };
    for (o, dst_px) in out.iter_mut().enumerate().take(sh.clip.out_w) {
        let (start, ws) = sh.hk.tap(o);
        *dst_px = convolve(
            ws.iter().enumerate().map(|(j, &w)| (w, src_row[start + j])),
            sh.src_argb,
        );
    }
}

/// Pass 2: vertical resample of intermediate columns into the destination.
fn vpass_row(sh: &ConvShared, oy: usize) {
    let (start, ws) = sh.vk.tap(oy);
    let base = start - sh.vk.min_input();
    let dst_row = unsafe { sh.dst.row_mut(sh.clip.dy0 + oy) };
    for col in 0..sh.clip.out_w {
        let px = convolve(
            ws.iter()
                .enumerate()
                .map(|(j, &w)| (w, unsafe { sh.mid.row(base + j) }[col])),
            sh.src_argb,
        );
        let d = &mut dst_row[sh.clip.dx0 + col];
        *d = if sh.src_argb { px.blend_over(*d) } else { px };
    }
}

/// Weighted accumulation of one tap run.
///
/// The alpha branch weights every channel by `w * alpha` and divides by the
/// accumulated `w * alpha`; the plain branch is a straight fixed-point dot
/// product. Channels saturate to `[0, 255]` (negative lobes of the cubic
/// kernels can overshoot).
#[inline]
fn convolve(taps: impl Iterator<Item = (i32, Color)>, argb: bool) -> Color {
    if argb {
        let (mut aw, mut r, mut g, mut b) = (0i64, 0i64, 0i64, 0i64);
        for (w, c) in taps {
            let wa = w as i64 * c.a() as i64;
            aw += wa;
            r += wa * c.r() as i64;
            g += wa * c.g() as i64;
            b += wa * c.b() as i64;
        }
        if aw <= 0 {
            return Color::TRANSPARENT;
        }
        let a = (aw >> FIXED_BITS).clamp(0, 255) as u8;
        Color::from_channels(
            a,
            (r / aw).clamp(0, 255) as u8,
            (g / aw).clamp(0, 255) as u8,
            (b / aw).clamp(0, 255) as u8,
        )
    } else {
        let (mut r, mut g, mut b) = (0i64, 0i64, 0i64);
        for (w, c) in taps {
            let w = w as i64;
            r += w * c.r() as i64;
            g += w * c.g() as i64;
            b += w * c.b() as i64;
        }
        Color::from_channels(
            255,
            (r >> FIXED_BITS).clamp(0, 255) as u8,
            (g >> FIXED_BITS).clamp(0, 255) as u8,
            (b >> FIXED_BITS).clamp(0, 255) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: u32 = 0xffff_0000;
    const G: u32 = 0xff00_ff00;
    const B: u32 = 0xff00_00ff;
    const W: u32 = 0xffff_ffff;

    fn pixmap_from(format: PixelFormat, w: usize, h: usize, values: &[u32]) -> Pixmap {
        let data = values.iter().copied().map(Color).collect();
        Pixmap::from_vec(format, w, h, data).unwrap()
    }

    #[test]
    fn nearest_identity_at_scale_one() {
        let src = pixmap_from(PixelFormat::Xrgb, 2, 2, &[R, G, B, W]);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 2, 2).unwrap();
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 1.0, Filter::Nearest, false);
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    fn nearest_doubles_into_quadrants() {
        let src = pixmap_from(PixelFormat::Xrgb, 2, 2, &[R, G, B, W]);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 4, 4).unwrap();
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 2.0, Filter::Nearest, false);
        let expect: Vec<u32> = vec![
            R, R, G, G, //
            R, R, G, G, //
            B, B, W, W, //
            B, B, W, W,
        ];
        assert_eq!(dst.data().iter().map(|c| c.0).collect::<Vec<_>>(), expect);
    }

    #[test]
    fn nearest_clips_negative_offset() {
        let src = pixmap_from(PixelFormat::Xrgb, 2, 2, &[R, G, B, W]);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 2, 2).unwrap();
        Renderer::single_threaded().render(&src, &mut dst, -1, -1, 2.0, Filter::Nearest, false);
        // Window shows scaled rows/cols 1..3 of the 4x4 quadrant image.
        let expect: Vec<u32> = vec![R, G, B, W];
        assert_eq!(dst.data().iter().map(|c| c.0).collect::<Vec<_>>(), expect);
    }

    #[test]
    fn out_of_window_render_is_noop() {
        let src = pixmap_from(PixelFormat::Xrgb, 2, 2, &[R, G, B, W]);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 4, 4).unwrap();
        for f in Filter::ALL {
            Renderer::single_threaded().render(&src, &mut dst, 100, 100, 1.0, f, false);
            Renderer::single_threaded().render(&src, &mut dst, -100, -100, 1.0, f, false);
        }
        assert!(dst.data().iter().all(|c| c.0 == 0));
    }

    #[test]
    fn constant_color_survives_every_filter_and_scale() {
        for format in [PixelFormat::Xrgb, PixelFormat::Argb] {
            let src = pixmap_from(format, 9, 7, &[0xff66_3344; 63]);
            for filter in Filter::ALL {
                for scale in [0.37, 0.5, 1.0, 1.6, 3.0] {
                    let mut dst = Pixmap::new(PixelFormat::Xrgb, 16, 16).unwrap();
                    Renderer::single_threaded().render(&src, &mut dst, 0, 0, scale, filter, false);
                    let out_w = ((9.0 * scale) as usize).clamp(1, 16);
                    let out_h = ((7.0 * scale) as usize).clamp(1, 16);
                    for y in 0..out_h {
                        for x in 0..out_w {
                            assert_eq!(
                                dst.pixel(x, y).0,
                                0xff66_3344,
                                "{filter} scale {scale} at ({x},{y})"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn box_downscale_matches_row_averaging() {
        // Purely vertical gradient: every output must be the average of the
        // two source rows it covers, within +-1 per channel.
        let mut rows = Vec::new();
        let levels = [10u32, 40, 90, 160, 200, 220, 240, 250];
        for level in levels {
            for _ in 0..4 {
                rows.push(0xff00_0000 | (level << 16) | (level << 8) | level);
            }
        }
        let src = pixmap_from(PixelFormat::Xrgb, 4, 8, &rows);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 2, 4).unwrap();
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 0.5, Filter::Box, false);
        for y in 0..4 {
            let expect = (levels[2 * y] + levels[2 * y + 1]) as f64 / 2.0;
            for x in 0..2 {
                let got = dst.pixel(x, y).r() as f64;
                assert!(
                    (got - expect).abs() <= 1.0,
                    "row {y}: got {got}, expect {expect}"
                );
            }
        }
    }

    #[test]
    fn transparent_pixels_do_not_darken_neighbors() {
        // Box-downscale a [transparent, opaque red] pair to one pixel over a
        // white background: with alpha-weighted division the red channel
        // stays saturated; without it the result would drift toward 191.
        let src = pixmap_from(PixelFormat::Argb, 2, 1, &[0x0000_0000, 0xffff_0000]);
        let mut dst = pixmap_from(PixelFormat::Xrgb, 1, 1, &[W]);
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 0.5, Filter::Box, false);
        let out = dst.pixel(0, 0);
        assert_eq!(out.r(), 255);
        assert!(out.a() == 255);
        // Half coverage lets the white background through on green/blue.
        assert!((127..=129).contains(&out.g()), "g = {}", out.g());
        assert_eq!(out.g(), out.b());
    }

    #[test]
    fn argb_render_blends_over_destination() {
        let src = pixmap_from(PixelFormat::Argb, 2, 2, &[0x8000_0000; 4]);
        let mut dst = pixmap_from(PixelFormat::Xrgb, 2, 2, &[W; 4]);
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 1.0, Filter::Nearest, false);
        let expect = Color(0x8000_0000).blend_over(Color(W));
        assert!(dst.data().iter().all(|c| *c == expect));
    }

    #[test]
    fn xrgb_render_forces_opaque() {
        let src = pixmap_from(PixelFormat::Xrgb, 1, 1, &[0x0012_3456]);
        let mut dst = Pixmap::new(PixelFormat::Xrgb, 1, 1).unwrap();
        Renderer::single_threaded().render(&src, &mut dst, 0, 0, 1.0, Filter::Nearest, false);
        assert_eq!(dst.pixel(0, 0).0, 0xff12_3456);
    }
}
