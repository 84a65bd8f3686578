//! In-memory media repository.
//!
//! Same semantics as the Postgres implementation over a process-local map.
//! Used by tests and by callers embedding the pipeline without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use varia_core::models::{
    ensure_variant_integrity, MediaAsset, MediaAssetDraft, MediaQuery, MediaSortField, MediaStats,
    MediaType, SortOrder,
};
use varia_core::MediaError;

use crate::repository::{MediaDetailsUpdate, MediaRepository};

/// Map-backed media repository
#[derive(Clone, Default)]
pub struct InMemoryMediaRepository {
    assets: Arc<Mutex<HashMap<Uuid, MediaAsset>>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn create(&self, draft: MediaAssetDraft) -> Result<MediaAsset, MediaError> {
        ensure_variant_integrity(&draft.variants)
            .map_err(|e| MediaError::Internal(anyhow::anyhow!("asset integrity: {}", e)))?;

        let asset = draft.into_asset(Uuid::new_v4(), Utc::now());
        self.assets
            .lock()
            .unwrap()
            .insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, MediaError> {
        Ok(self.assets.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, query: &MediaQuery) -> Result<Vec<MediaAsset>, MediaError> {
        let assets = self.assets.lock().unwrap();
        let mut matched: Vec<MediaAsset> = assets
            .values()
            .filter(|a| query.user_id.map_or(true, |u| a.user_id == Some(u)))
            .filter(|a| query.media_type.map_or(true, |t| a.media_type == t))
            .filter(|a| {
                query.tags.is_empty() || a.tags.iter().any(|t| query.tags.contains(t))
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let ordering = match query.sort.field {
                MediaSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                MediaSortField::FileSize => a.file_size.cmp(&b.file_size),
                MediaSortField::Title => a.title.cmp(&b.title),
            };
            match query.sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Ok(matched
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn update_details(
        &self,
        id: Uuid,
        update: MediaDetailsUpdate,
    ) -> Result<MediaAsset, MediaError> {
        let mut assets = self.assets.lock().unwrap();
        let asset = assets
            .get_mut(&id)
            .ok_or_else(|| MediaError::NotFound(format!("media {} not found", id)))?;

        if let Some(title) = update.title {
            asset.title = Some(title);
        }
        if let Some(description) = update.description {
            asset.description = Some(description);
        }
        if let Some(tags) = update.tags {
            asset.tags = tags;
        }
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, MediaError> {
        Ok(self.assets.lock().unwrap().remove(&id).is_some())
    }

    async fn stats(&self) -> Result<MediaStats, MediaError> {
        let assets = self.assets.lock().unwrap();
        let mut stats = MediaStats {
            total: 0,
            images: 0,
            videos: 0,
            total_size_bytes: 0,
            by_provider: HashMap::new(),
        };
        for asset in assets.values() {
            stats.total += 1;
            match asset.media_type {
                MediaType::Image => stats.images += 1,
                MediaType::Video => stats.videos += 1,
            }
            stats.total_size_bytes += asset.file_size;
            *stats
                .by_provider
                .entry(asset.provider.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}
