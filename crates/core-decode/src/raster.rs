//! Catch-all raster decoder built on the `image` crate.
//!
//! Handles everything the dedicated decoders do not claim: JPEG, BMP, TIFF,
//! WebP, and animated GIF (per-frame delays preserved).

use crate::{DecodeError, registry::Decoder};
use core_image::{Frame, ImageData};
use core_pixmap::{Color, PixelFormat, Pixmap};
use image::AnimationDecoder;
use image::ImageFormat;
use std::io::Cursor;

pub struct RasterDecoder;

fn pixmap_from_rgba(
    buffer: &image::RgbaImage,
    alpha_seen: &mut bool,
) -> Result<Pixmap, DecodeError> {
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);
    let mut alpha = false;
    let pixels: Vec<Color> = buffer
        .pixels()
        .map(|p| {
            alpha |= p[3] != 255;
            Color::from_channels(p[3], p[0], p[1], p[2])
        })
        .collect();
    *alpha_seen |= alpha;
    let format = if alpha {
        PixelFormat::Argb
    } else {
        PixelFormat::Xrgb
    };
    Pixmap::from_vec(format, w, h, pixels).map_err(|e| DecodeError::format("raster", e))
}

fn format_tag(format: ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}

impl Decoder for RasterDecoder {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn probe(&self, data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }

    fn decode(&self, data: &[u8], _source: &str) -> Result<ImageData, DecodeError> {
        let format =
            image::guess_format(data).map_err(|e| DecodeError::format("raster", e))?;
        let tag = format_tag(format);

        let mut out = ImageData {
            format: Some(tag.clone()),
            ..Default::default()
        };

        if format == ImageFormat::Gif {
            let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(data))
                .map_err(|e| DecodeError::format(&tag, e))?;
            let frames = decoder
                .into_frames()
                .collect_frames()
                .map_err(|e| DecodeError::format(&tag, e))?;
            for frame in frames {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let duration_ms = if denom == 0 { 0 } else { numer / denom };
                let pixmap = pixmap_from_rgba(frame.buffer(), &mut out.alpha)?;
                out.frames.push(Frame::with_duration(pixmap, duration_ms));
            }
            if out.frames.is_empty() {
                return Err(DecodeError::format(&tag, "no frames"));
            }
        } else {
            let dynamic = image::load_from_memory_with_format(data, format)
                .map_err(|e| DecodeError::format(&tag, e))?;
            let pixmap = pixmap_from_rgba(&dynamic.to_rgba8(), &mut out.alpha)?;
            out.frames.push(Frame::new(pixmap));
        }

        // A mixed animation keeps every frame blendable once any frame
        // carries alpha.
        if out.alpha {
            for frame in &mut out.frames {
                frame.pixmap.set_format(PixelFormat::Argb);
            }
        }
        Ok(out)
    }
}
