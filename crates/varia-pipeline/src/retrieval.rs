//! Retrieval/optimization service: size- and network-aware variant lookup.

use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use varia_core::models::MediaAsset;
use varia_core::MediaError;

use crate::repository::MediaRepository;

/// Size requested when the caller supplies neither a size nor a hint.
pub const DEFAULT_SIZE: &str = "medium";

/// Coarse client network classification. A heuristic label, not a measured
/// bandwidth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkHint {
    Slow,
    Medium,
    Fast,
}

impl NetworkHint {
    /// Fixed hint-to-size mapping. A hint always wins over an explicit size.
    pub fn preferred_size(&self) -> &'static str {
        match self {
            NetworkHint::Slow => "thumbnail",
            NetworkHint::Medium => "small",
            NetworkHint::Fast => "medium",
        }
    }
}

impl FromStr for NetworkHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slow" => Ok(NetworkHint::Slow),
            "medium" => Ok(NetworkHint::Medium),
            "fast" => Ok(NetworkHint::Fast),
            other => Err(format!("unknown network hint: {}", other)),
        }
    }
}

/// A resolved variant URL together with the size that actually served it
/// (which may be `"original"` after fallback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedUrl {
    pub url: String,
    pub size: String,
}

/// Resolve a size label against an asset's variants, falling back to the
/// original. An asset without any variants answers `NotFound`; the integrity
/// rules make that case unreachable for persisted records.
pub fn resolve_variant(asset: &MediaAsset, size: &str) -> Result<OptimizedUrl, MediaError> {
    if let Some(variant) = asset.variant(size) {
        return Ok(OptimizedUrl {
            url: variant.url.clone(),
            size: variant.size.clone(),
        });
    }

    if let Some(original) = asset.original_variant() {
        tracing::debug!(
            media_id = %asset.id,
            requested = %size,
            "No matching variant; falling back to original"
        );
        return Ok(OptimizedUrl {
            url: original.url.clone(),
            size: original.size.clone(),
        });
    }

    Err(MediaError::NotFound(format!(
        "media {} has no variants",
        asset.id
    )))
}

/// Repository-backed retrieval service.
pub struct RetrievalService {
    repository: Arc<dyn MediaRepository>,
}

impl RetrievalService {
    pub fn new(repository: Arc<dyn MediaRepository>) -> Self {
        Self { repository }
    }

    /// `GetOptimizedUrl`: hint overrides size, size defaults to
    /// [`DEFAULT_SIZE`], missing sizes fall back to the original variant.
    pub async fn optimized_url(
        &self,
        media_id: Uuid,
        requested_size: Option<&str>,
        hint: Option<NetworkHint>,
    ) -> Result<OptimizedUrl, MediaError> {
        let asset = self
            .repository
            .get(media_id)
            .await?
            .ok_or_else(|| MediaError::NotFound(format!("media {} not found", media_id)))?;

        let size = hint
            .map(|h| h.preferred_size())
            .or(requested_size)
            .unwrap_or(DEFAULT_SIZE);

        resolve_variant(&asset, size)
    }
}
