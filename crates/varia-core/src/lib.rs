//! Varia core library
//!
//! Shared types for the media ingestion pipeline: domain models, the error
//! taxonomy, configuration, and the telemetry bootstrap. This crate performs
//! no I/O; the processing, storage, and pipeline crates build on it.

pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use config::{CdnConfig, ObjectStoreConfig, PipelineConfig};
pub use error::{ErrorMetadata, LogLevel, MediaError};
