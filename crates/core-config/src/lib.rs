//! Configuration loading and validation.
//!
//! Parses `iris.toml` (working directory first, then the platform config
//! dir) with tolerant deserialization: unknown fields are ignored so the
//! file can evolve, and invalid values are logged and replaced by their
//! defaults rather than failing startup. Mode-name strings (ordering,
//! filter, scale/position modes) stay strings here; the binary maps them
//! onto the core enums and applies the same warn-and-default policy.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "iris.toml";

/// `[list]` section: ordering and traversal.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListSection {
    pub order: String,
    pub reverse: bool,
    pub recursive: bool,
    /// Wrap traversal at the list ends.
    pub r#loop: bool,
}

impl Default for ListSection {
    fn default() -> Self {
        Self {
            order: "alpha".into(),
            reverse: false,
            recursive: false,
            r#loop: true,
        }
    }
}

/// `[cache]` section: decoded-image budgets.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSection {
    pub preload: usize,
    pub history: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            preload: 2,
            history: 4,
        }
    }
}

/// `[thumbnails]` section.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThumbSection {
    pub size: usize,
    pub fill: bool,
    pub aa: String,
    /// On-disk cache budget in megabytes; 0 disables persistence.
    pub cache_mb: u64,
    pub padding: usize,
}

impl Default for ThumbSection {
    fn default() -> Self {
        Self {
            size: 200,
            fill: true,
            aa: "mks13".into(),
            cache_mb: 32,
            padding: 10,
        }
    }
}

/// `[viewer]` section: viewport defaults.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewerSection {
    pub aa: String,
    pub scale: String,
    pub position: String,
    pub window_bg: String,
    /// Either `grid` or a `#aarrggbb` color.
    pub transparent_bg: String,
}

impl Default for ViewerSection {
    fn default() -> Self {
        Self {
            aa: "mks13".into(),
            scale: "optimal".into(),
            position: "center".into(),
            window_bg: "#ff000000".into(),
            transparent_bg: "grid".into(),
        }
    }
}

/// `[slideshow]` section.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlideshowSection {
    pub seconds: u64,
}

impl Default for SlideshowSection {
    fn default() -> Self {
        Self { seconds: 3 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub list: ListSection,
    pub cache: CacheSection,
    pub thumbnails: ThumbSection,
    pub viewer: ViewerSection,
    pub slideshow: SlideshowSection,
}

/// Loaded configuration plus its provenance.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    pub path: Option<PathBuf>,
}

/// Sanity bounds applied after parsing; out-of-range values warn and fall
/// back to the section default.
fn validate(mut file: ConfigFile) -> ConfigFile {
    if file.cache.preload > 128 {
        warn!(target: "config", value = file.cache.preload, "cache.preload out of range, using default");
        file.cache.preload = CacheSection::default().preload;
    }
    if file.cache.history > 128 {
        warn!(target: "config", value = file.cache.history, "cache.history out of range, using default");
        file.cache.history = CacheSection::default().history;
    }
    if file.thumbnails.size == 0 || file.thumbnails.size > 4096 {
        warn!(target: "config", value = file.thumbnails.size, "thumbnails.size out of range, using default");
        file.thumbnails.size = ThumbSection::default().size;
    }
    if file.slideshow.seconds == 0 {
        warn!(target: "config", "slideshow.seconds must be positive, using default");
        file.slideshow.seconds = SlideshowSection::default().seconds;
    }
    file
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("iris").join(CONFIG_FILE);
    }
    local
}

/// Load the configuration. A missing file yields defaults; an unparsable
/// file logs and yields defaults (startup never fails on configuration).
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = std::fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config loaded");
            Ok(Config {
                file: validate(file),
                path: Some(path),
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config unparsable, using defaults");
            Ok(Config::default())
        }
    }
}

/// Parse `#aarrggbb` / `#rrggbb` into a packed ARGB value.
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#')?;
    match hex.len() {
        8 => u32::from_str_radix(hex, 16).ok(),
        6 => u32::from_str_radix(hex, 16).ok().map(|v| v | 0xff00_0000),
        _ => None,
    }
}
