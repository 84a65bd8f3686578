//! Variant configuration tables.
//!
//! Each media type carries a fixed set of named tiers. The `"original"` entry
//! is a passthrough: no geometry or encoding parameters, bytes copied
//! verbatim by the transform engine.

use serde::{Deserialize, Serialize};

use super::media::ORIGINAL_VARIANT;

/// Geometry and quality for one derived image tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

/// One named image tier. `geometry` is `None` only for the passthrough entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVariantSpec {
    pub name: String,
    pub geometry: Option<ImageGeometry>,
}

impl ImageVariantSpec {
    pub fn is_original(&self) -> bool {
        self.name == ORIGINAL_VARIANT
    }
}

/// Bitrate and target resolution for one derived video tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncoding {
    pub bitrate_kbps: u32,
    /// Named resolution such as `"720p"`; see [`named_resolution`].
    pub resolution: String,
}

/// One named video tier. `encoding` is `None` only for the passthrough entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVariantSpec {
    pub name: String,
    pub encoding: Option<VideoEncoding>,
}

impl VideoVariantSpec {
    pub fn is_original(&self) -> bool {
        self.name == ORIGINAL_VARIANT
    }
}

/// Map a named resolution to explicit pixel dimensions. Unrecognized names
/// return `None`; the transcoder then re-encodes without a scale constraint.
pub fn named_resolution(name: &str) -> Option<(u32, u32)> {
    match name {
        "480p" => Some((854, 480)),
        "720p" => Some((1280, 720)),
        "1080p" => Some((1920, 1080)),
        _ => None,
    }
}

/// Default image tiers: thumbnail/small/medium/large plus the passthrough.
pub fn default_image_variants() -> Vec<ImageVariantSpec> {
    let tier = |name: &str, width, height, quality| ImageVariantSpec {
        name: name.to_string(),
        geometry: Some(ImageGeometry {
            width,
            height,
            quality,
        }),
    };
    vec![
        tier("thumbnail", 150, 150, 70),
        tier("small", 400, 400, 80),
        tier("medium", 800, 800, 80),
        tier("large", 1600, 1600, 85),
        ImageVariantSpec {
            name: ORIGINAL_VARIANT.to_string(),
            geometry: None,
        },
    ]
}

/// Default video tiers: low/medium/high plus the passthrough.
pub fn default_video_variants() -> Vec<VideoVariantSpec> {
    let tier = |name: &str, bitrate_kbps, resolution: &str| VideoVariantSpec {
        name: name.to_string(),
        encoding: Some(VideoEncoding {
            bitrate_kbps,
            resolution: resolution.to_string(),
        }),
    };
    vec![
        tier("low", 1400, "480p"),
        tier("medium", 2800, "720p"),
        tier("high", 5000, "1080p"),
        VideoVariantSpec {
            name: ORIGINAL_VARIANT.to_string(),
            encoding: None,
        },
    ]
}

/// Validate a tier table: names unique, exactly one passthrough entry, and
/// every derived entry fully parameterized.
pub fn validate_tier_names<'a, I>(names: I) -> Result<(), String>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut seen = std::collections::HashSet::new();
    let mut originals = 0usize;
    for (name, is_original) in names {
        if !seen.insert(name.to_string()) {
            return Err(format!("duplicate variant tier: {}", name));
        }
        if is_original {
            originals += 1;
        }
    }
    if originals != 1 {
        return Err(format!(
            "expected exactly one '{}' tier, found {}",
            ORIGINAL_VARIANT, originals
        ));
    }
    Ok(())
}
