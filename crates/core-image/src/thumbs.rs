//! Persisted thumbnail cache and the PNG export path.
//!
//! Cached thumbnails are PNG files named by a hash of the source path, with
//! a sidecar recording the parameters they were produced under. A reader
//! whose current policy differs from the sidecar rejects the file, so stale
//! thumbnails are never shown (parameters are part of the validity check,
//! not the filename).

use core_pixmap::{Color, PixelFormat, Pixmap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ThumbError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("png encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("png decoding failed: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("unsupported thumbnail color type {0:?}")]
    ColorType(png::ColorType),
    #[error("sidecar serialization failed: {0}")]
    Sidecar(#[from] toml::ser::Error),
}

/// Parameters a cached thumbnail was produced under. All of them must match
/// the reader's expectation or the cached file is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbParams {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub fill: bool,
    pub antialias: String,
    pub scale: f64,
}

/// FNV-1a over the source path: stable across runs, which the on-disk cache
/// requires (the std hasher is randomly keyed).
fn source_hash(source: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in source.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

fn cache_paths(dir: &Path, source: &str) -> (PathBuf, PathBuf) {
    let hash = source_hash(source);
    (
        dir.join(format!("{hash:016x}.png")),
        dir.join(format!("{hash:016x}.toml")),
    )
}

/// Write a pixmap as RGBA8 PNG.
pub fn export_png(pixmap: &Pixmap, path: &Path) -> Result<(), ThumbError> {
    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        pixmap.width() as u32,
        pixmap.height() as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    let mut bytes = Vec::with_capacity(pixmap.data().len() * 4);
    for c in pixmap.data() {
        bytes.extend_from_slice(&[c.r(), c.g(), c.b(), c.a()]);
    }
    writer.write_image_data(&bytes)?;
    writer.finish()?;
    Ok(())
}

fn read_png(path: &Path, format: PixelFormat) -> Result<Pixmap, ThumbError> {
    let decoder = png::Decoder::new(BufReader::new(fs::File::open(path)?));
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
        return Err(ThumbError::ColorType(info.color_type));
    }
    let data: Vec<Color> = buf[..info.buffer_size()]
        .chunks_exact(4)
        .map(|px| Color::from_channels(px[3], px[0], px[1], px[2]))
        .collect();
    Ok(Pixmap::from_vec(format, info.width as usize, info.height as usize, data)
        .expect("png dimensions match buffer"))
}

/// Persist a thumbnail and its parameter sidecar.
pub fn save_thumbnail(
    dir: &Path,
    source: &str,
    thumb: &Pixmap,
    params: &ThumbParams,
) -> Result<(), ThumbError> {
    fs::create_dir_all(dir)?;
    let (png_path, sidecar_path) = cache_paths(dir, source);
    export_png(thumb, &png_path)?;
    fs::write(&sidecar_path, toml::to_string(params)?)?;
    debug!(target: "image.thumbs", source, path = %png_path.display(), "thumbnail cached");
    Ok(())
}

/// Load a cached thumbnail if one exists *and* its sidecar parameters match
/// `expect`. A missing, unreadable, or stale entry yields `Ok(None)`.
pub fn load_thumbnail(
    dir: &Path,
    source: &str,
    expect: &ThumbParams,
    format: PixelFormat,
) -> Result<Option<Pixmap>, ThumbError> {
    let (png_path, sidecar_path) = cache_paths(dir, source);
    let Ok(raw) = fs::read_to_string(&sidecar_path) else {
        return Ok(None);
    };
    let recorded: ThumbParams = match toml::from_str(&raw) {
        Ok(p) => p,
        Err(e) => {
            warn!(target: "image.thumbs", source, %e, "invalid thumbnail sidecar");
            return Ok(None);
        }
    };
    if recorded != *expect {
        debug!(target: "image.thumbs", source, "stale thumbnail parameters, rejecting");
        return Ok(None);
    }
    if !png_path.exists() {
        return Ok(None);
    }
    Ok(Some(read_png(&png_path, format)?))
}

/// Delete the oldest cached thumbnails until the directory fits the budget.
pub fn prune(dir: &Path, budget_bytes: u64) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut files: Vec<(PathBuf, u64, std::time::SystemTime)> = entries
        .flatten()
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            meta.is_file().then(|| {
                (
                    e.path(),
                    meta.len(),
                    meta.modified().unwrap_or(std::time::UNIX_EPOCH),
                )
            })
        })
        .collect();
    let mut total: u64 = files.iter().map(|(_, len, _)| len).sum();
    if total <= budget_bytes {
        return;
    }
    files.sort_by_key(|(_, _, mtime)| *mtime);
    for (path, len, _) in files {
        if total <= budget_bytes {
            break;
        }
        if fs::remove_file(&path).is_ok() {
            total -= len;
            debug!(target: "image.thumbs", path = %path.display(), "pruned cached thumbnail");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ThumbParams {
        ThumbParams {
            width: 4,
            height: 4,
            offset_x: 0,
            offset_y: 0,
            fill: true,
            antialias: "box".into(),
            scale: 0.5,
        }
    }

    fn sample_thumb() -> Pixmap {
        let data = (0..16)
            .map(|i| Color::from_channels(255, i as u8 * 10, 0, 255 - i as u8))
            .collect();
        Pixmap::from_vec(PixelFormat::Xrgb, 4, 4, data).unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let thumb = sample_thumb();
        save_thumbnail(dir.path(), "/pics/a.png", &thumb, &params()).unwrap();
        let loaded = load_thumbnail(dir.path(), "/pics/a.png", &params(), PixelFormat::Xrgb)
            .unwrap()
            .expect("cached thumbnail");
        assert_eq!(loaded.data(), thumb.data());
    }

    #[test]
    fn mismatched_parameters_reject_cache() {
        let dir = tempfile::tempdir().unwrap();
        save_thumbnail(dir.path(), "/pics/a.png", &sample_thumb(), &params()).unwrap();
        let mut other = params();
        other.antialias = "bicubic".into();
        let loaded =
            load_thumbnail(dir.path(), "/pics/a.png", &other, PixelFormat::Xrgb).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded =
            load_thumbnail(dir.path(), "/pics/none.png", &params(), PixelFormat::Xrgb).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn distinct_sources_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        save_thumbnail(dir.path(), "/pics/a.png", &sample_thumb(), &params()).unwrap();
        save_thumbnail(dir.path(), "/pics/b.png", &sample_thumb(), &params()).unwrap();
        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 4); // two pngs + two sidecars
    }

    #[test]
    fn prune_respects_budget() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..6 {
            let source = format!("/pics/{i}.png");
            save_thumbnail(dir.path(), &source, &sample_thumb(), &params()).unwrap();
        }
        prune(dir.path(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
