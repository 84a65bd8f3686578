use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use serde_json::Value as JsonValue;
#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Label of the mandatory passthrough variant. Every persisted asset carries
/// exactly one variant with this size; it is the retrieval fallback.
pub const ORIGINAL_VARIANT: &str = "original";

/// Media type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a MIME type by prefix match (`image/*` or `video/*`).
    pub fn from_content_type(content_type: &str) -> Option<MediaType> {
        let normalized = content_type.to_lowercase();
        if normalized.starts_with("image/") {
            Some(MediaType::Image)
        } else if normalized.starts_with("video/") {
            Some(MediaType::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// Storage/transform backend that owns an asset's artifacts.
///
/// Fixed at upload time; an asset never migrates between providers in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_provider", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum MediaProvider {
    ManagedCdn,
    ObjectStore,
}

impl MediaProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaProvider::ManagedCdn => "managed-cdn",
            MediaProvider::ObjectStore => "object-store",
        }
    }
}

impl std::str::FromStr for MediaProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "managed-cdn" => Ok(MediaProvider::ManagedCdn),
            "object-store" => Ok(MediaProvider::ObjectStore),
            other => Err(format!("unknown media provider: {}", other)),
        }
    }
}

/// One derived rendition of an uploaded source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaVariant {
    pub size: String,
    pub url: String,
    pub file_size: i64,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MediaVariant {
    pub fn is_original(&self) -> bool {
        self.size == ORIGINAL_VARIANT
    }
}

/// Persisted record for one uploaded source file and all its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Uuid,
    pub provider: MediaProvider,
    /// Provider-assigned identifier, used for provider-side delete/describe.
    pub provider_id: String,
    pub media_type: MediaType,
    pub original_name: String,
    pub content_type: String,
    pub format: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub variants: Vec<MediaVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaAsset {
    /// The mandatory passthrough variant. `None` only for a record that
    /// violates the integrity rules (never persisted).
    pub fn original_variant(&self) -> Option<&MediaVariant> {
        self.variants.iter().find(|v| v.is_original())
    }

    /// Look up a variant by its size label.
    pub fn variant(&self, size: &str) -> Option<&MediaVariant> {
        self.variants.iter().find(|v| v.size == size)
    }

    /// Check the structural invariants that must hold for every persisted
    /// asset: exactly one `"original"` variant, unique size labels, sane
    /// numeric fields, and a populated format on every variant.
    pub fn ensure_integrity(&self) -> Result<(), String> {
        ensure_variant_integrity(&self.variants)?;
        if self.file_size < 0 {
            return Err(format!("negative file size: {}", self.file_size));
        }
        if self.format.is_empty() {
            return Err("asset format is empty".to_string());
        }
        Ok(())
    }
}

/// Validate a variant list against the asset integrity rules.
pub fn ensure_variant_integrity(variants: &[MediaVariant]) -> Result<(), String> {
    let originals = variants.iter().filter(|v| v.is_original()).count();
    if originals != 1 {
        return Err(format!(
            "expected exactly one '{}' variant, found {}",
            ORIGINAL_VARIANT, originals
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for v in variants {
        if !seen.insert(v.size.as_str()) {
            return Err(format!("duplicate variant size: {}", v.size));
        }
        if v.file_size < 0 {
            return Err(format!("variant {} has negative file size", v.size));
        }
        if v.format.is_empty() {
            return Err(format!("variant {} has empty format", v.size));
        }
        if v.width.map_or(false, |w| w < 0) || v.height.map_or(false, |h| h < 0) {
            return Err(format!("variant {} has negative dimensions", v.size));
        }
    }
    Ok(())
}

/// Asset data assembled by the orchestrator, before persistence assigns the
/// id and timestamps. Keeping this separate from [`MediaAsset`] lets a caller
/// retry persistence after a metadata-write failure without re-uploading.
#[derive(Debug, Clone)]
pub struct MediaAssetDraft {
    pub provider: MediaProvider,
    pub provider_id: String,
    pub media_type: MediaType,
    pub original_name: String,
    pub content_type: String,
    pub format: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub user_id: Option<Uuid>,
    pub variants: Vec<MediaVariant>,
}

impl MediaAssetDraft {
    /// Promote the draft to a full asset with a fresh id and timestamps.
    pub fn into_asset(self, id: Uuid, now: DateTime<Utc>) -> MediaAsset {
        MediaAsset {
            id,
            provider: self.provider,
            provider_id: self.provider_id,
            media_type: self.media_type,
            original_name: self.original_name,
            content_type: self.content_type,
            format: self.format,
            file_size: self.file_size,
            width: self.width,
            height: self.height,
            title: self.title,
            description: self.description,
            tags: self.tags,
            user_id: self.user_id,
            variants: self.variants,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Database row for the media table (variants stored as JSONB).
#[cfg(feature = "sqlx")]
#[derive(Debug, FromRow)]
pub struct MediaRow {
    pub id: Uuid,
    pub provider: MediaProvider,
    pub provider_id: String,
    pub media_type: MediaType,
    pub original_name: String,
    pub content_type: String,
    pub format: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub user_id: Option<Uuid>,
    pub variants: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl MediaRow {
    /// Build a MediaAsset from this row, parsing the variants JSONB.
    pub fn into_asset(self) -> Result<MediaAsset, serde_json::Error> {
        let variants: Vec<MediaVariant> = serde_json::from_value(self.variants)?;
        Ok(MediaAsset {
            id: self.id,
            provider: self.provider,
            provider_id: self.provider_id,
            media_type: self.media_type,
            original_name: self.original_name,
            content_type: self.content_type,
            format: self.format,
            file_size: self.file_size,
            width: self.width,
            height: self.height,
            title: self.title,
            description: self.description,
            tags: self.tags,
            user_id: self.user_id,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(size: &str) -> MediaVariant {
        MediaVariant {
            size: size.to_string(),
            url: format!("https://cdn.example.com/{}", size),
            file_size: 1024,
            format: "jpg".to_string(),
            width: Some(100),
            height: Some(100),
            bitrate_kbps: None,
            resolution: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_media_type_from_content_type() {
        assert_eq!(
            MediaType::from_content_type("image/jpeg"),
            Some(MediaType::Image)
        );
        assert_eq!(
            MediaType::from_content_type("VIDEO/mp4"),
            Some(MediaType::Video)
        );
        assert_eq!(MediaType::from_content_type("application/pdf"), None);
    }

    #[test]
    fn test_provider_round_trip() {
        let p: MediaProvider = "managed-cdn".parse().unwrap();
        assert_eq!(p, MediaProvider::ManagedCdn);
        assert_eq!(p.as_str(), "managed-cdn");
        assert!("dropbox".parse::<MediaProvider>().is_err());
    }

    #[test]
    fn test_variant_integrity_requires_single_original() {
        let err = ensure_variant_integrity(&[variant("thumbnail")]).unwrap_err();
        assert!(err.contains("original"));

        let err =
            ensure_variant_integrity(&[variant("original"), variant("original")]).unwrap_err();
        assert!(err.contains("found 2"));

        assert!(ensure_variant_integrity(&[variant("original"), variant("thumbnail")]).is_ok());
    }

    #[test]
    fn test_variant_integrity_rejects_duplicates() {
        let err = ensure_variant_integrity(&[
            variant("original"),
            variant("small"),
            variant("small"),
        ])
        .unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_variant_integrity_rejects_empty_format() {
        let mut bad = variant("original");
        bad.format = String::new();
        let err = ensure_variant_integrity(&[bad]).unwrap_err();
        assert!(err.contains("empty format"));
    }

    #[test]
    fn test_draft_into_asset() {
        let draft = MediaAssetDraft {
            provider: MediaProvider::ObjectStore,
            provider_id: "media/abc".to_string(),
            media_type: MediaType::Image,
            original_name: "photo.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            format: "jpg".to_string(),
            file_size: 2048,
            width: Some(800),
            height: Some(600),
            title: None,
            description: None,
            tags: vec!["food".to_string()],
            user_id: None,
            variants: vec![variant("original")],
        };
        let id = Uuid::new_v4();
        let asset = draft.into_asset(id, Utc::now());
        assert_eq!(asset.id, id);
        assert_eq!(asset.created_at, asset.updated_at);
        assert!(asset.original_variant().is_some());
        assert!(asset.ensure_integrity().is_ok());
    }
}
