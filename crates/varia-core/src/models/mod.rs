//! Domain models for media assets, variants, and queries.

pub mod media;
pub mod query;
pub mod variant;

pub use media::{
    ensure_variant_integrity, MediaAsset, MediaAssetDraft, MediaProvider, MediaType, MediaVariant,
    ORIGINAL_VARIANT,
};
#[cfg(feature = "sqlx")]
pub use media::MediaRow;
pub use query::{MediaQuery, MediaSort, MediaSortField, MediaStats, SortOrder};
pub use variant::{
    default_image_variants, default_video_variants, named_resolution, validate_tier_names,
    ImageGeometry, ImageVariantSpec, VideoEncoding, VideoVariantSpec,
};
