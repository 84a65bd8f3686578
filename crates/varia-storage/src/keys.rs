//! Shared key layout for provider-side artifacts.
//!
//! One uploaded asset owns the prefix `{folder}/{uuid}`; each variant lives
//! at `{prefix}/{size}.{format}`. The prefix doubles as the provider id, so
//! delete/describe operate on everything beneath it.

use uuid::Uuid;

const DEFAULT_FOLDER: &str = "media";

/// Generate the per-asset key prefix (also the provider id).
pub fn asset_key(folder: &str, id: Uuid) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}/{}", DEFAULT_FOLDER, id)
    } else {
        format!("{}/{}", folder, id)
    }
}

/// Key of one variant artifact under an asset prefix.
pub fn variant_key(asset_key: &str, size: &str, format: &str) -> String {
    format!("{}/{}.{}", asset_key, size, format)
}
