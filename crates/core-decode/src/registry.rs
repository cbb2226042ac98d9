//! Decoder trait and the priority-ordered registry.

use crate::{DecodeError, source};
use core_image::{Image, ImageData};
use tracing::{debug, trace, warn};

/// Registration tiers, tried highest first. Equal tiers keep registration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Highest,
    High,
    Normal,
    Low,
    Lowest,
}

/// A format decoder. `probe` must be cheap (signature sniffing); `decode`
/// may assume `probe` returned true but must still validate the stream.
pub trait Decoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn probe(&self, data: &[u8]) -> bool;
    fn decode(&self, data: &[u8], source: &str) -> Result<ImageData, DecodeError>;
}

pub struct DecoderRegistry {
    decoders: Vec<(Priority, Box<dyn Decoder>)>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// The stock decoder stack: the dedicated PNG decoder ahead of the
    /// catch-all raster decoder.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register(Priority::High, Box::new(crate::PngDecoder));
        reg.register(Priority::Normal, Box::new(crate::RasterDecoder));
        reg
    }

    pub fn register(&mut self, priority: Priority, decoder: Box<dyn Decoder>) {
        debug!(target: "decode", decoder = decoder.name(), ?priority, "decoder registered");
        let at = self
            .decoders
            .partition_point(|(p, _)| *p <= priority);
        self.decoders.insert(at, (priority, decoder));
    }

    /// Decode the entry's source and attach the result.
    ///
    /// Decoders are probed in priority order; the first claimant decodes.
    /// Outcomes map to [`DecodeError`]: unreadable source is `Io`, an
    /// unclaimed stream is `Unsupported`, a claimed-but-invalid stream is
    /// `Format`.
    pub fn load(&self, image: &Image) -> Result<(), DecodeError> {
        let bytes = source::read_source(image.source())?;
        for (_, decoder) in &self.decoders {
            if !decoder.probe(&bytes) {
                trace!(target: "decode", decoder = decoder.name(), source = image.source(), "probe declined");
                continue;
            }
            match decoder.decode(&bytes, image.source()) {
                Ok(mut data) => {
                    debug!(
                        target: "decode",
                        decoder = decoder.name(),
                        source = image.source(),
                        frames = data.frames.len(),
                        "decoded"
                    );
                    annotate(&mut data, bytes.len());
                    image.attach(data);
                    image.refresh_stat();
                    image.reset_failures();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        target: "decode",
                        decoder = decoder.name(),
                        source = image.source(),
                        error = %e,
                        "decode failed"
                    );
                    return Err(e);
                }
            }
        }
        Err(DecodeError::Unsupported)
    }
}

/// Standard info fields every decoded image carries.
fn annotate(data: &mut ImageData, byte_len: usize) {
    if let Some(format) = data.format.clone() {
        data.push_info("Format", format);
    }
    if let Some((w, h)) = data.size() {
        data.push_info("Size", format!("{w}x{h}"));
    }
    if data.frames.len() > 1 {
        data.push_info("Frames", data.frames.len().to_string());
    }
    data.push_info("File size", format!("{byte_len} bytes"));
}
