//! Image transformer - renders one variant from a source buffer.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use std::io::Cursor;

use varia_core::models::ImageVariantSpec;

use crate::image::resize::ImageResize;
use crate::TransformError;

/// A rendered variant: encoded bytes plus the resulting geometry and format.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Image variant renderer.
///
/// Derived tiers are resized fill-fit and re-encoded as quality-controlled
/// JPEG; the passthrough tier returns the source bytes verbatim (never
/// re-encoded) with its decoded dimensions.
pub struct ImageTransformer;

impl ImageTransformer {
    /// Short format string for a source content type, used for the
    /// passthrough variant which keeps its container.
    pub fn detect_format(content_type: &str) -> String {
        match content_type.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            other => other.strip_prefix("image/").unwrap_or("bin"),
        }
        .to_string()
    }

    /// Decode just far enough to read the source dimensions.
    pub fn dimensions(data: &[u8]) -> Result<(u32, u32), anyhow::Error> {
        let reader = image::ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        Ok(reader.into_dimensions()?)
    }

    /// Render one variant. CPU-bound; callers run this under
    /// `tokio::task::spawn_blocking`.
    pub fn render_variant(
        data: &[u8],
        spec: &ImageVariantSpec,
        source_content_type: &str,
    ) -> Result<RenderedImage, TransformError> {
        let fail = |message: String| TransformError::new(spec.name.clone(), message);

        let geometry = match spec.geometry {
            Some(geometry) => geometry,
            None => {
                // Passthrough: bytes copied verbatim, only the dimensions are read.
                let (width, height) =
                    Self::dimensions(data).map_err(|e| fail(format!("decode failed: {}", e)))?;
                return Ok(RenderedImage {
                    data: Bytes::copy_from_slice(data),
                    width,
                    height,
                    format: Self::detect_format(source_content_type),
                });
            }
        };

        let img = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| fail(format!("format detection failed: {}", e)))?
            .decode()
            .map_err(|e| fail(format!("decode failed: {}", e)))?;

        let resized = ImageResize::resize_to_fill(&img, geometry.width, geometry.height);
        let (width, height) = resized.dimensions();

        // JPEG has no alpha channel; flatten before encoding.
        let rgb = resized.to_rgb8();
        let estimated_size = (width * height * 3) as usize;
        let mut buffer = Vec::with_capacity(estimated_size);
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), geometry.quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| fail(format!("encode failed: {}", e)))?;

        Ok(RenderedImage {
            data: Bytes::from(buffer),
            width,
            height,
            format: "jpg".to_string(),
        })
    }
}
