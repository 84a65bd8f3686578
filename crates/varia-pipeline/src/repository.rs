//! Media metadata repository.
//!
//! The trait is the persistence boundary for the whole pipeline; the Postgres
//! implementation stores one row per asset with the variant list as JSONB and
//! computes statistics with aggregation SQL rather than loading records.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

use varia_core::models::{
    ensure_variant_integrity, MediaAsset, MediaAssetDraft, MediaProvider, MediaQuery, MediaRow,
    MediaStats,
};
use varia_core::MediaError;

/// Caller-editable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct MediaDetailsUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Persistence boundary for media assets.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Persist a fully assembled asset. Enforces the variant integrity rules;
    /// a draft violating them is never written.
    async fn create(&self, draft: MediaAssetDraft) -> Result<MediaAsset, MediaError>;

    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, MediaError>;

    /// Filter by owner/type/tag intersection, sort by a whitelisted field,
    /// page via offset+limit.
    async fn list(&self, query: &MediaQuery) -> Result<Vec<MediaAsset>, MediaError>;

    async fn update_details(
        &self,
        id: Uuid,
        update: MediaDetailsUpdate,
    ) -> Result<MediaAsset, MediaError>;

    /// Remove the record. Returns `false` when the id was already absent.
    async fn delete(&self, id: Uuid) -> Result<bool, MediaError>;

    /// Aggregate statistics, computed in the store.
    async fn stats(&self) -> Result<MediaStats, MediaError>;
}

const SELECT_COLUMNS: &str = "id, provider, provider_id, media_type, original_name, \
     content_type, format, file_size, width, height, title, description, tags, user_id, \
     variants, created_at, updated_at";

/// Postgres-backed media repository
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: PgPool,
}

impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn persistence(e: sqlx::Error) -> MediaError {
        MediaError::Persistence(e.to_string())
    }

    fn row_to_asset(row: MediaRow) -> Result<MediaAsset, MediaError> {
        row.into_asset()
            .map_err(|e| MediaError::Internal(anyhow::anyhow!("corrupt variants column: {}", e)))
    }
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    async fn create(&self, draft: MediaAssetDraft) -> Result<MediaAsset, MediaError> {
        ensure_variant_integrity(&draft.variants)
            .map_err(|e| MediaError::Internal(anyhow::anyhow!("asset integrity: {}", e)))?;

        let asset = draft.into_asset(Uuid::new_v4(), Utc::now());
        let variants_json = serde_json::to_value(&asset.variants)?;

        sqlx::query(
            "INSERT INTO media_assets (id, provider, provider_id, media_type, original_name, \
             content_type, format, file_size, width, height, title, description, tags, user_id, \
             variants, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(asset.id)
        .bind(asset.provider)
        .bind(&asset.provider_id)
        .bind(asset.media_type)
        .bind(&asset.original_name)
        .bind(&asset.content_type)
        .bind(&asset.format)
        .bind(asset.file_size)
        .bind(asset.width)
        .bind(asset.height)
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.tags)
        .bind(asset.user_id)
        .bind(&variants_json)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::persistence)?;

        tracing::debug!(media_id = %asset.id, provider = %asset.provider.as_str(), "Media asset persisted");
        Ok(asset)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, MediaError> {
        let row: Option<MediaRow> = sqlx::query_as(&format!(
            "SELECT {} FROM media_assets WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::persistence)?;

        row.map(Self::row_to_asset).transpose()
    }

    async fn list(&self, query: &MediaQuery) -> Result<Vec<MediaAsset>, MediaError> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM media_assets WHERE TRUE",
            SELECT_COLUMNS
        ));

        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(media_type) = query.media_type {
            builder.push(" AND media_type = ").push_bind(media_type);
        }
        if !query.tags.is_empty() {
            // Array overlap: at least one queried tag present.
            builder.push(" AND tags && ").push_bind(query.tags.clone());
        }

        // Sort field/order come from a closed enum, never from caller text.
        builder.push(format!(
            " ORDER BY {} {}",
            query.sort.field.as_column(),
            query.sort.order.as_sql()
        ));
        builder.push(" LIMIT ").push_bind(query.limit.max(0));
        builder.push(" OFFSET ").push_bind(query.offset.max(0));

        let rows: Vec<MediaRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Self::persistence)?;

        rows.into_iter().map(Self::row_to_asset).collect()
    }

    async fn update_details(
        &self,
        id: Uuid,
        update: MediaDetailsUpdate,
    ) -> Result<MediaAsset, MediaError> {
        let row: Option<MediaRow> = sqlx::query_as(&format!(
            "UPDATE media_assets SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             tags = COALESCE($4, tags), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.tags)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::persistence)?;

        match row {
            Some(row) => Self::row_to_asset(row),
            None => Err(MediaError::NotFound(format!("media {} not found", id))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, MediaError> {
        let result = sqlx::query("DELETE FROM media_assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::persistence)?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<MediaStats, MediaError> {
        let totals = sqlx::query(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE media_type = 'image') AS images, \
             COUNT(*) FILTER (WHERE media_type = 'video') AS videos, \
             COALESCE(SUM(file_size), 0)::BIGINT AS total_size_bytes \
             FROM media_assets",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Self::persistence)?;

        let provider_rows = sqlx::query(
            "SELECT provider, COUNT(*) AS count FROM media_assets GROUP BY provider",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::persistence)?;

        let mut by_provider = std::collections::HashMap::new();
        for row in provider_rows {
            let provider: MediaProvider = row.try_get("provider").map_err(Self::persistence)?;
            let count: i64 = row.try_get("count").map_err(Self::persistence)?;
            by_provider.insert(provider.as_str().to_string(), count);
        }

        Ok(MediaStats {
            total: totals.try_get("total").map_err(Self::persistence)?,
            images: totals.try_get("images").map_err(Self::persistence)?,
            videos: totals.try_get("videos").map_err(Self::persistence)?,
            total_size_bytes: totals
                .try_get("total_size_bytes")
                .map_err(Self::persistence)?,
            by_provider,
        })
    }
}
