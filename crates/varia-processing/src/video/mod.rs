//! Video processing module

pub mod transcoder;

pub use transcoder::{container_format, TranscodedVariant, VideoTranscoder};
