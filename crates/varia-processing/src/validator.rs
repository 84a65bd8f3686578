use varia_core::models::MediaType;
use varia_core::PipelineConfig;

/// Validation errors for incoming uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported content type: {content_type} (expected image/* or video/*)")]
    UnsupportedContentType { content_type: String },

    #[error("Content type not allowed: {content_type} (allowed: {allowed:?})")]
    ContentTypeNotAllowed {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Upload validator
///
/// Checks size limits and MIME allow-lists before any provider or filesystem
/// work starts. Classification (image vs. video) falls out of the same check
/// so callers never consult the content type twice.
pub struct MediaValidator {
    max_image_size: usize,
    max_video_size: usize,
    image_content_types: Vec<String>,
    video_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(
        max_image_size: usize,
        max_video_size: usize,
        image_content_types: Vec<String>,
        video_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_image_size,
            max_video_size,
            image_content_types,
            video_content_types,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.max_image_size_bytes,
            config.max_video_size_bytes,
            config.image_content_types.clone(),
            config.video_content_types.clone(),
        )
    }

    /// Classify by MIME prefix; anything outside image/* and video/* is
    /// rejected outright.
    pub fn classify(&self, content_type: &str) -> Result<MediaType, ValidationError> {
        MediaType::from_content_type(content_type).ok_or_else(|| {
            ValidationError::UnsupportedContentType {
                content_type: content_type.to_string(),
            }
        })
    }

    /// Validate size and content type; returns the classified media type so
    /// the orchestrator can pick the matching variant table.
    pub fn validate(
        &self,
        content_type: &str,
        file_size: usize,
    ) -> Result<MediaType, ValidationError> {
        if file_size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        let media_type = self.classify(content_type)?;
        let normalized = content_type.to_lowercase();

        let (allowed, max) = match media_type {
            MediaType::Image => (&self.image_content_types, self.max_image_size),
            MediaType::Video => (&self.video_content_types, self.max_video_size),
        };

        if !allowed.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::ContentTypeNotAllowed {
                content_type: content_type.to_string(),
                allowed: allowed.clone(),
            });
        }

        if file_size > max {
            return Err(ValidationError::FileTooLarge {
                size: file_size,
                max,
            });
        }

        Ok(media_type)
    }
}
