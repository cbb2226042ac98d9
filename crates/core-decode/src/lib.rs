//! Decoder registry and source resolution.
//!
//! Decoders register with a priority tier and are probed in tier order
//! against the slurped source bytes; the first decoder that claims the
//! stream decodes it. A claimed-but-invalid stream is a format error (no
//! further decoders are consulted), an unclaimed stream is unsupported.
//!
//! Sources are filesystem paths plus two pseudo schemes: `stdin://` reads
//! standard input once, `exec://<cmd>` captures the stdout of `sh -c <cmd>`.

mod png_dec;
mod raster;
mod registry;
mod source;

pub use png_dec::PngDecoder;
pub use raster::RasterDecoder;
pub use registry::{Decoder, DecoderRegistry, Priority};
pub use source::{SourceKind, classify, read_source};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// No registered decoder recognized the stream.
    #[error("unsupported image data")]
    Unsupported,
    /// A decoder claimed the stream but the data is invalid.
    #[error("malformed {format} data: {reason}")]
    Format { format: String, reason: String },
    /// The source itself could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn format(format: impl Into<String>, reason: impl ToString) -> Self {
        DecodeError::Format {
            format: format.into(),
            reason: reason.to_string(),
        }
    }
}
