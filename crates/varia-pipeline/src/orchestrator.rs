//! Upload orchestrator: validate → classify → dispatch → aggregate-or-abort → persist.
//!
//! The single entry point for ingesting a file. Validation runs before any
//! provider or filesystem work; the chosen adapter fans out one concurrent
//! task per variant tier behind a barrier and cleans up partial results on
//! failure; only a fully assembled asset ever reaches the repository. Every
//! stage logs under one correlation id per attempt.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use varia_core::models::{
    ImageVariantSpec, MediaAsset, MediaAssetDraft, MediaProvider, MediaType, VideoVariantSpec,
};
use varia_core::{MediaError, PipelineConfig};
use varia_processing::MediaValidator;
use varia_storage::{ProviderAdapter, SourceFile};

/// One upload request as handed over by the API layer after multipart
/// decoding. Absent descriptive fields stay absent; they are never defaulted
/// to placeholder strings.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub content_type: String,
    pub original_name: String,
    pub user_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder: Option<String>,
    /// Backend override; the configured default applies when absent.
    pub provider: Option<MediaProvider>,
}

impl UploadRequest {
    pub fn new(data: Bytes, content_type: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            original_name: original_name.into(),
            user_id: None,
            tags: Vec::new(),
            title: None,
            description: None,
            folder: None,
            provider: None,
        }
    }
}

fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let base = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

/// Upload pipeline control center.
pub struct UploadOrchestrator {
    adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>>,
    repository: Arc<dyn crate::repository::MediaRepository>,
    validator: MediaValidator,
    image_variants: Vec<ImageVariantSpec>,
    video_variants: Vec<VideoVariantSpec>,
    default_provider: MediaProvider,
}

impl UploadOrchestrator {
    pub fn new(
        config: &PipelineConfig,
        repository: Arc<dyn crate::repository::MediaRepository>,
        adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>>,
    ) -> Self {
        Self {
            adapters,
            repository,
            validator: MediaValidator::from_config(config),
            image_variants: config.image_variants.clone(),
            video_variants: config.video_variants.clone(),
            default_provider: config.default_provider,
        }
    }

    fn adapter(&self, provider: MediaProvider) -> Result<&Arc<dyn ProviderAdapter>, MediaError> {
        self.adapters.get(&provider).ok_or_else(|| {
            MediaError::Internal(anyhow::anyhow!(
                "no adapter configured for provider {}",
                provider.as_str()
            ))
        })
    }

    /// Ingest one file and return the persisted asset with its variant list.
    pub async fn upload(&self, request: UploadRequest) -> Result<MediaAsset, MediaError> {
        let upload_id = Uuid::new_v4();

        // Validation is synchronous and side-effect free: a rejected request
        // has touched neither the provider nor the filesystem.
        let media_type = self
            .validator
            .validate(&request.content_type, request.data.len())
            .map_err(|e| MediaError::Validation(e.to_string()))?;

        let provider = request.provider.unwrap_or(self.default_provider);
        let adapter = self.adapter(provider)?;
        let folder = request.folder.as_deref().unwrap_or("media");

        tracing::info!(
            upload_id = %upload_id,
            provider = %provider.as_str(),
            media_type = %media_type.as_str(),
            size_bytes = request.data.len(),
            original_name = %request.original_name,
            "Starting media upload"
        );

        let file = SourceFile {
            data: request.data,
            original_name: sanitize_filename(&request.original_name),
            content_type: request.content_type,
        };

        // The adapter owns the per-variant fan-out and the barrier: it
        // returns either every configured variant or an error after cleaning
        // up whatever had already been uploaded.
        let metadata = match media_type {
            MediaType::Image => {
                adapter
                    .upload_image(&file, &self.image_variants, folder)
                    .await
            }
            MediaType::Video => {
                adapter
                    .upload_video(&file, &self.video_variants, folder)
                    .await
            }
        }
        .map_err(|e| {
            tracing::warn!(upload_id = %upload_id, error = %e, "Upload aborted");
            MediaError::UploadFailed {
                correlation_id: upload_id,
                source: anyhow::Error::new(e),
            }
        })?;

        let draft = MediaAssetDraft {
            provider,
            provider_id: metadata.provider_id,
            media_type,
            original_name: file.original_name,
            content_type: file.content_type,
            format: metadata.format,
            file_size: metadata.file_size,
            width: metadata.width,
            height: metadata.height,
            title: request.title,
            description: request.description,
            tags: request.tags,
            user_id: request.user_id,
            variants: metadata.variants,
        };

        // A failure past this point is a persistence failure: the artifacts
        // are live and valid, so no cleanup runs and the error class stays
        // distinct for caller-level retry.
        let asset = self.repository.create(draft).await?;

        tracing::info!(
            upload_id = %upload_id,
            media_id = %asset.id,
            variant_count = asset.variants.len(),
            "Media upload complete"
        );
        Ok(asset)
    }
}
