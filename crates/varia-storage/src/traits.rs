//! Provider adapter abstraction
//!
//! All storage/transform backends implement the [`ProviderAdapter`] trait so
//! the upload orchestrator can fan out variant work without knowing which
//! backend performs it.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use varia_core::models::{
    ImageVariantSpec, MediaProvider, MediaType, MediaVariant, VideoVariantSpec,
};
use varia_processing::TransformError;

/// Provider operation errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Provider call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// An incoming source file, read-only from every variant task's perspective.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub data: Bytes,
    pub original_name: String,
    pub content_type: String,
}

impl SourceFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Aggregated result of one upload: the provider-assigned identifier plus one
/// [`MediaVariant`] per configured tier, original included.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub provider: MediaProvider,
    pub provider_id: String,
    /// Format of the original (short container/codec string).
    pub format: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub variants: Vec<MediaVariant>,
}

/// Storage/transform backend contract.
///
/// Uploads produce every configured variant or fail as a whole: an adapter
/// must clean up the artifacts that did succeed before returning an error.
/// `delete` is idempotent; an unknown id is logged, not propagated, so
/// metadata cleanup is never blocked on provider-side eventual consistency.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which backend this adapter fronts.
    fn provider(&self) -> MediaProvider;

    /// Upload an image and produce one artifact per variant tier.
    async fn upload_image(
        &self,
        file: &SourceFile,
        variants: &[ImageVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata>;

    /// Upload a video and produce one artifact per variant tier.
    async fn upload_video(
        &self,
        file: &SourceFile,
        variants: &[VideoVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata>;

    /// Remove every artifact belonging to `provider_id`.
    async fn delete(&self, provider_id: &str, media_type: MediaType) -> ProviderResult<()>;

    /// Provider-native information about an uploaded resource.
    async fn describe(
        &self,
        provider_id: &str,
        media_type: MediaType,
    ) -> ProviderResult<serde_json::Value>;
}
