//! MediaService - the boundary operations exposed to callers.
//!
//! Thin facade wiring the orchestrator, repository, retrieval service, and
//! provider adapters together. The API layer in front of this service has
//! already handled transport concerns (multipart decoding, rate limiting,
//! authentication); everything here is domain behavior.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use varia_core::models::{MediaAsset, MediaProvider, MediaQuery, MediaStats};
use varia_core::{MediaError, PipelineConfig};
use varia_storage::{create_adapter, ProviderAdapter};

use crate::orchestrator::{UploadOrchestrator, UploadRequest};
use crate::repository::{MediaDetailsUpdate, MediaRepository};
use crate::retrieval::{resolve_variant, NetworkHint, OptimizedUrl, RetrievalService};

/// Facade over the media pipeline.
pub struct MediaService {
    orchestrator: UploadOrchestrator,
    repository: Arc<dyn MediaRepository>,
    retrieval: RetrievalService,
    adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>>,
}

impl MediaService {
    pub fn new(
        config: &PipelineConfig,
        repository: Arc<dyn MediaRepository>,
        adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>>,
    ) -> Self {
        Self {
            orchestrator: UploadOrchestrator::new(config, repository.clone(), adapters.clone()),
            retrieval: RetrievalService::new(repository.clone()),
            repository,
            adapters,
        }
    }

    /// Build the service with one adapter per backend named in the
    /// configuration.
    pub fn from_config(
        config: &PipelineConfig,
        repository: Arc<dyn MediaRepository>,
    ) -> Result<Self, MediaError> {
        let mut adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>> = HashMap::new();
        if config.cdn.is_some() {
            adapters.insert(
                MediaProvider::ManagedCdn,
                create_adapter(config, MediaProvider::ManagedCdn)
                    .map_err(|e| MediaError::Internal(anyhow::Error::new(e)))?,
            );
        }
        if config.object_store.is_some() {
            adapters.insert(
                MediaProvider::ObjectStore,
                create_adapter(config, MediaProvider::ObjectStore)
                    .map_err(|e| MediaError::Internal(anyhow::Error::new(e)))?,
            );
        }
        Ok(Self::new(config, repository, adapters))
    }

    /// Ingest a file and return the persisted asset.
    pub async fn upload_media(&self, request: UploadRequest) -> Result<MediaAsset, MediaError> {
        self.orchestrator.upload(request).await
    }

    /// Fetch an asset. When `size` is supplied the label must resolve to a
    /// variant or the original; an asset that can serve neither is reported
    /// as `NotFound`.
    pub async fn get_media(
        &self,
        media_id: Uuid,
        size: Option<&str>,
    ) -> Result<MediaAsset, MediaError> {
        let asset = self
            .repository
            .get(media_id)
            .await?
            .ok_or_else(|| MediaError::NotFound(format!("media {} not found", media_id)))?;

        if let Some(size) = size {
            resolve_variant(&asset, size)?;
        }
        Ok(asset)
    }

    pub async fn get_optimized_url(
        &self,
        media_id: Uuid,
        size: Option<&str>,
        hint: Option<NetworkHint>,
    ) -> Result<OptimizedUrl, MediaError> {
        self.retrieval.optimized_url(media_id, size, hint).await
    }

    pub async fn list_media(&self, query: &MediaQuery) -> Result<Vec<MediaAsset>, MediaError> {
        self.repository.list(query).await
    }

    pub async fn update_media_details(
        &self,
        media_id: Uuid,
        update: MediaDetailsUpdate,
    ) -> Result<MediaAsset, MediaError> {
        self.repository.update_details(media_id, update).await
    }

    /// Delete an asset: provider artifacts first, then the metadata record.
    ///
    /// Deleting an id that no longer exists is a no-op, and a provider-side
    /// delete failure is logged rather than propagated: provider deletes are
    /// idempotent and eventually consistent, and must never block metadata
    /// cleanup.
    pub async fn delete_media(
        &self,
        media_id: Uuid,
        requesting_owner: Option<Uuid>,
    ) -> Result<(), MediaError> {
        let asset = match self.repository.get(media_id).await? {
            Some(asset) => asset,
            None => {
                tracing::debug!(media_id = %media_id, "Delete of absent media is a no-op");
                return Ok(());
            }
        };

        if let Some(requester) = requesting_owner {
            if asset.user_id != Some(requester) {
                return Err(MediaError::Forbidden(format!(
                    "media {} is not owned by the requesting user",
                    media_id
                )));
            }
        }

        match self.adapters.get(&asset.provider) {
            Some(adapter) => {
                if let Err(e) = adapter.delete(&asset.provider_id, asset.media_type).await {
                    tracing::warn!(
                        media_id = %media_id,
                        provider = %asset.provider.as_str(),
                        error = %e,
                        "Provider-side delete failed; continuing with metadata delete"
                    );
                }
            }
            None => {
                tracing::warn!(
                    media_id = %media_id,
                    provider = %asset.provider.as_str(),
                    "No adapter configured for provider; skipping artifact delete"
                );
            }
        }

        self.repository.delete(media_id).await?;
        tracing::info!(media_id = %media_id, "Media deleted");
        Ok(())
    }

    /// Provider-native info for an asset, straight from the backend.
    pub async fn describe_media(&self, media_id: Uuid) -> Result<serde_json::Value, MediaError> {
        let asset = self
            .repository
            .get(media_id)
            .await?
            .ok_or_else(|| MediaError::NotFound(format!("media {} not found", media_id)))?;

        let adapter = self.adapters.get(&asset.provider).ok_or_else(|| {
            MediaError::Internal(anyhow::anyhow!(
                "no adapter configured for provider {}",
                asset.provider.as_str()
            ))
        })?;

        adapter
            .describe(&asset.provider_id, asset.media_type)
            .await
            .map_err(|e| match e {
                varia_storage::ProviderError::NotFound(msg) => MediaError::NotFound(msg),
                other => MediaError::Internal(anyhow::Error::new(other)),
            })
    }

    pub async fn get_stats(&self) -> Result<MediaStats, MediaError> {
        self.repository.stats().await
    }
}
