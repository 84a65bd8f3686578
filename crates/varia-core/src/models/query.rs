//! Query and statistics models for the media repository.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::media::MediaType;

/// Sortable fields. Whitelisted so the repository never interpolates
/// caller-supplied column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSortField {
    CreatedAt,
    FileSize,
    Title,
}

impl MediaSortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            MediaSortField::CreatedAt => "created_at",
            MediaSortField::FileSize => "file_size",
            MediaSortField::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSort {
    pub field: MediaSortField,
    pub order: SortOrder,
}

impl Default for MediaSort {
    fn default() -> Self {
        MediaSort {
            field: MediaSortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

/// Filter, sort, and page parameters for listing media assets.
///
/// Tag filtering matches on set intersection: an asset qualifies when it
/// carries at least one of the queried tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaQuery {
    pub user_id: Option<Uuid>,
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort: MediaSort,
    pub limit: i64,
    pub offset: i64,
}

impl Default for MediaQuery {
    fn default() -> Self {
        MediaQuery {
            user_id: None,
            media_type: None,
            tags: Vec::new(),
            sort: MediaSort::default(),
            limit: 50,
            offset: 0,
        }
    }
}

/// Aggregate statistics over the media table, computed in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStats {
    pub total: i64,
    pub images: i64,
    pub videos: i64,
    pub total_size_bytes: i64,
    pub by_provider: HashMap<String, i64>,
}
