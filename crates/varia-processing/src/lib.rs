//! Varia processing library
//!
//! The transform engine: upload validation, image resize + re-encode, and
//! ffmpeg video transcoding. Pure byte/file conversion; uploading the results
//! is the storage crate's concern.

pub mod image;
pub mod validator;
pub mod video;

pub use crate::image::{ImageTransformer, RenderedImage};
pub use validator::{MediaValidator, ValidationError};
pub use video::{container_format, TranscodedVariant, VideoTranscoder};

/// A variant's resize/transcode failed. Carries the size label so the
/// orchestrator can report which tier broke; the engine never leaves a
/// partially written "success" output behind.
#[derive(Debug, thiserror::Error)]
#[error("transform failed for variant '{size}': {message}")]
pub struct TransformError {
    pub size: String,
    pub message: String,
}

impl TransformError {
    pub fn new(size: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError {
            size: size.into(),
            message: message.into(),
        }
    }
}
