//! Dedicated PNG decoder built on the `png` crate.
//!
//! Registered above the catch-all raster decoder: PNG is the dominant
//! format in practice and the direct reader avoids a second format sniff.

use crate::{DecodeError, registry::Decoder};
use core_image::{Frame, ImageData};
use core_pixmap::{Color, PixelFormat, Pixmap};
use std::io::Cursor;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub struct PngDecoder;

impl Decoder for PngDecoder {
    fn name(&self) -> &'static str {
        "png"
    }

    fn probe(&self, data: &[u8]) -> bool {
        data.starts_with(&PNG_SIGNATURE)
    }

    fn decode(&self, data: &[u8], _source: &str) -> Result<ImageData, DecodeError> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        // Normalize palettes and sub-byte depths to plain 8-bit channels.
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| DecodeError::format("PNG", e))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| DecodeError::format("PNG", e))?;
        let (w, h) = (info.width as usize, info.height as usize);
        let bytes = &buf[..info.buffer_size()];

        let mut alpha = false;
        let pixels: Vec<Color> = match info.color_type {
            png::ColorType::Rgba => bytes
                .chunks_exact(4)
                .map(|px| {
                    alpha |= px[3] != 255;
                    Color::from_channels(px[3], px[0], px[1], px[2])
                })
                .collect(),
            png::ColorType::Rgb => bytes
                .chunks_exact(3)
                .map(|px| Color::from_channels(255, px[0], px[1], px[2]))
                .collect(),
            png::ColorType::Grayscale => bytes
                .iter()
                .map(|&v| Color::from_channels(255, v, v, v))
                .collect(),
            png::ColorType::GrayscaleAlpha => bytes
                .chunks_exact(2)
                .map(|px| {
                    alpha |= px[1] != 255;
                    Color::from_channels(px[1], px[0], px[0], px[0])
                })
                .collect(),
            other => {
                return Err(DecodeError::format(
                    "PNG",
                    format!("unexpected color type {other:?} after expansion"),
                ));
            }
        };

        let format = if alpha {
            PixelFormat::Argb
        } else {
            PixelFormat::Xrgb
        };
        let pixmap = Pixmap::from_vec(format, w, h, pixels)
            .map_err(|e| DecodeError::format("PNG", e))?;

        let mut out = ImageData {
            format: Some("PNG".into()),
            alpha,
            ..Default::default()
        };
        out.frames.push(Frame::new(pixmap));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_rgba(w: u32, h: u32, rgba: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, w, h);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(rgba).unwrap();
        }
        bytes
    }

    #[test]
    fn probe_requires_signature() {
        let dec = PngDecoder;
        assert!(dec.probe(&encode_rgba(1, 1, &[1, 2, 3, 255])));
        assert!(!dec.probe(b"GIF89a"));
        assert!(!dec.probe(b""));
    }

    #[test]
    fn decodes_opaque_as_xrgb() {
        let bytes = encode_rgba(2, 1, &[10, 20, 30, 255, 40, 50, 60, 255]);
        let data = PngDecoder.decode(&bytes, "mem").unwrap();
        assert!(!data.alpha);
        assert_eq!(data.format.as_deref(), Some("PNG"));
        let pm = &data.frames[0].pixmap;
        assert_eq!(pm.format(), PixelFormat::Xrgb);
        assert_eq!(pm.pixel(0, 0).0, 0xff0a_141e);
        assert_eq!(pm.pixel(1, 0).0, 0xff28_323c);
    }

    #[test]
    fn decodes_translucency_as_argb() {
        let bytes = encode_rgba(1, 1, &[255, 0, 0, 128]);
        let data = PngDecoder.decode(&bytes, "mem").unwrap();
        assert!(data.alpha);
        let pm = &data.frames[0].pixmap;
        assert_eq!(pm.format(), PixelFormat::Argb);
        assert_eq!(pm.pixel(0, 0).0, 0x80ff_0000);
    }

    #[test]
    fn truncated_stream_is_format_error() {
        let mut bytes = encode_rgba(4, 4, &[128; 64]);
        bytes.truncate(20);
        let err = PngDecoder.decode(&bytes, "mem").unwrap_err();
        assert!(matches!(err, DecodeError::Format { .. }));
    }
}
