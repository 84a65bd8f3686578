//! Error types module
//!
//! Unified error taxonomy for the media pipeline. Validation failures are
//! reported before any provider work starts; transform and provider failures
//! are aggregated into a single upload failure carrying a correlation id;
//! persistence failures are surfaced distinctly so a caller can retry the
//! metadata write without re-uploading artifacts.

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for aborted uploads and authorization refusals
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// The API layer in front of the pipeline maps these onto its transport.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// A transform or provider failure aborted the upload after cleanup of
    /// any variants that had already succeeded. The first failure wins; the
    /// correlation id ties the client response to the internal logs.
    #[error("upload {correlation_id} failed")]
    UploadFailed {
        correlation_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    /// Variants uploaded successfully but the metadata write failed. The
    /// provider-side artifacts are intentionally left in place so persistence
    /// can be retried without re-uploading.
    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Internal(anyhow::Error::new(err).context("IO error"))
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::Internal(anyhow::Error::new(err).context("JSON error"))
    }
}

/// Static metadata per variant: (http_status, error_code, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn static_metadata(err: &MediaError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        MediaError::Validation(_) => (400, "VALIDATION_ERROR", false, LogLevel::Debug),
        MediaError::UploadFailed { .. } => (400, "UPLOAD_FAILED", true, LogLevel::Warn),
        MediaError::Persistence(_) => (500, "PERSISTENCE_ERROR", true, LogLevel::Error),
        MediaError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        MediaError::Forbidden(_) => (403, "FORBIDDEN", false, LogLevel::Warn),
        MediaError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl MediaError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            MediaError::Validation(_) => "Validation",
            MediaError::UploadFailed { .. } => "UploadFailed",
            MediaError::Persistence(_) => "Persistence",
            MediaError::NotFound(_) => "NotFound",
            MediaError::Forbidden(_) => "Forbidden",
            MediaError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for MediaError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            MediaError::Validation(msg) => msg.clone(),
            // Never expose raw provider/transcoder output; the correlation id
            // is enough to find the cause in the logs.
            MediaError::UploadFailed { correlation_id, .. } => {
                format!("Upload failed (reference {})", correlation_id)
            }
            MediaError::Persistence(_) => "Failed to persist media metadata".to_string(),
            MediaError::NotFound(msg) => msg.clone(),
            MediaError::Forbidden(msg) => msg.clone(),
            MediaError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
