//! Managed-CDN adapter: the backend performs the transforms.
//!
//! The original is uploaded once; every derived variant is produced by a
//! transform call referencing the returned identifier, so no bytes are
//! resized locally. Byte sizes and dimensions reported by the backend are
//! authoritative and recorded as-is.

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

use varia_core::models::{
    ImageVariantSpec, MediaProvider, MediaType, MediaVariant, VideoVariantSpec,
};
use varia_core::CdnConfig;

use crate::compensation::CompensationLog;
use crate::keys;
use crate::traits::{
    ProviderAdapter, ProviderError, ProviderMetadata, ProviderResult, SourceFile,
};

/// Managed-CDN provider adapter.
///
/// Owns an explicitly constructed HTTP client; credentials come in through
/// [`CdnConfig`] at startup and there is no ambient global state.
#[derive(Clone)]
pub struct ManagedCdnAdapter {
    client: reqwest::Client,
    config: CdnConfig,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    url: String,
    bytes: i64,
    format: String,
    width: Option<i32>,
    height: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DeriveResponse {
    url: String,
    bytes: i64,
    format: String,
    width: Option<i32>,
    height: Option<i32>,
    bitrate_kbps: Option<u32>,
    resolution: Option<String>,
}

impl ManagedCdnAdapter {
    pub fn new(config: CdnConfig, timeout: Duration) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn kind(media_type: MediaType) -> &'static str {
        match media_type {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    fn resource_url(&self, kind: &str, tail: &str) -> String {
        format!(
            "{}/v1/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            kind,
            tail
        )
    }

    /// SHA-256 request signature over the id/timestamp pair and the secret.
    fn sign(&self, public_id: &str, timestamp: i64) -> String {
        let payload = format!(
            "public_id={}&timestamp={}{}",
            public_id, timestamp, self.config.api_secret
        );
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn map_request_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            ProviderError::UploadFailed(e.to_string())
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!(
                "provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            // The body may carry provider internals; the status is enough.
            return Err(ProviderError::UploadFailed(format!(
                "provider returned {}",
                status
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::UploadFailed(format!("invalid provider response: {}", e)))
    }

    async fn upload_original(
        &self,
        file: &SourceFile,
        public_id: &str,
        kind: &'static str,
    ) -> ProviderResult<UploadResponse> {
        let timestamp = Utc::now().timestamp();
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.original_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ProviderError::UploadFailed(format!("invalid content type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp.to_string())
            .text("api_key", self.config.api_key.clone())
            .text("signature", self.sign(public_id, timestamp));

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.resource_url(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let uploaded: UploadResponse = Self::parse_response(response).await?;
        tracing::debug!(
            public_id = %uploaded.public_id,
            size_bytes = uploaded.bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Original upload successful"
        );
        Ok(uploaded)
    }

    /// Ask the backend to produce one derived variant from the stored
    /// original. The transform runs provider-side.
    async fn derive(
        &self,
        kind: &'static str,
        public_id: &str,
        params: serde_json::Value,
    ) -> ProviderResult<DeriveResponse> {
        let timestamp = Utc::now().timestamp();
        let mut body = params;
        body["public_id"] = serde_json::json!(public_id);
        body["timestamp"] = serde_json::json!(timestamp);
        body["api_key"] = serde_json::json!(self.config.api_key);
        body["signature"] = serde_json::json!(self.sign(public_id, timestamp));

        let response = self
            .client
            .post(self.resource_url(kind, "derive"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        Self::parse_response(response).await
    }

    async fn delete_resource(&self, public_id: &str, kind: &'static str) -> ProviderResult<()> {
        let response = self
            .client
            .delete(self.resource_url(kind, public_id))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(public_id = %public_id, "Resource already absent; delete is a no-op");
            return Ok(());
        }
        if !status.is_success() {
            return Err(ProviderError::DeleteFailed(format!(
                "provider returned {}",
                status
            )));
        }
        Ok(())
    }

    /// Join the derived-variant fan-out; on the first failure abort the
    /// siblings and delete the original (the backend drops its derived
    /// renditions with it).
    async fn join_derive_tasks(
        &self,
        mut tasks: JoinSet<ProviderResult<MediaVariant>>,
        public_id: &str,
        kind: &'static str,
    ) -> ProviderResult<Vec<MediaVariant>> {
        let mut variants = Vec::new();
        let mut first_error: Option<ProviderError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(variant)) => variants.push(variant),
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        tracing::warn!(error = %e, public_id = %public_id, "Derive failed; aborting siblings");
                        first_error = Some(e);
                        tasks.abort_all();
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(ProviderError::UploadFailed(format!(
                            "derive task panicked: {}",
                            join_err
                        )));
                        tasks.abort_all();
                    }
                }
            }
        }

        if let Some(e) = first_error {
            let mut compensation = CompensationLog::new();
            compensation.push(public_id);
            let adapter = self.clone();
            compensation
                .run(|id| {
                    let adapter = adapter.clone();
                    async move { adapter.delete_resource(&id, kind).await }
                })
                .await;
            return Err(e);
        }

        Ok(variants)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ManagedCdnAdapter {
    fn provider(&self) -> MediaProvider {
        MediaProvider::ManagedCdn
    }

    async fn upload_image(
        &self,
        file: &SourceFile,
        variants: &[ImageVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        let kind = Self::kind(MediaType::Image);
        let requested_id = keys::asset_key(folder, Uuid::new_v4());

        let uploaded = self.upload_original(file, &requested_id, kind).await?;
        let public_id = uploaded.public_id.clone();

        let mut results = vec![MediaVariant {
            size: varia_core::models::ORIGINAL_VARIANT.to_string(),
            url: uploaded.url.clone(),
            file_size: uploaded.bytes,
            format: uploaded.format.clone(),
            width: uploaded.width,
            height: uploaded.height,
            bitrate_kbps: None,
            resolution: None,
            created_at: Utc::now(),
        }];

        let mut tasks = JoinSet::new();
        for spec in variants.iter().filter(|s| !s.is_original()).cloned() {
            let adapter = self.clone();
            let id = public_id.clone();
            tasks.spawn(async move {
                let geometry = spec.geometry.ok_or_else(|| {
                    ProviderError::ConfigError(format!(
                        "derived image tier '{}' has no geometry",
                        spec.name
                    ))
                })?;
                let derived = adapter
                    .derive(
                        kind,
                        &id,
                        serde_json::json!({
                            "name": &spec.name,
                            "width": geometry.width,
                            "height": geometry.height,
                            "quality": geometry.quality,
                        }),
                    )
                    .await?;
                Ok(MediaVariant {
                    size: spec.name,
                    url: derived.url,
                    file_size: derived.bytes,
                    format: derived.format,
                    width: derived.width,
                    height: derived.height,
                    bitrate_kbps: None,
                    resolution: None,
                    created_at: Utc::now(),
                })
            });
        }

        results.extend(self.join_derive_tasks(tasks, &public_id, kind).await?);

        Ok(ProviderMetadata {
            provider: MediaProvider::ManagedCdn,
            provider_id: public_id,
            format: uploaded.format,
            file_size: uploaded.bytes,
            width: uploaded.width,
            height: uploaded.height,
            variants: results,
        })
    }

    async fn upload_video(
        &self,
        file: &SourceFile,
        variants: &[VideoVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        let kind = Self::kind(MediaType::Video);
        let requested_id = keys::asset_key(folder, Uuid::new_v4());

        let uploaded = self.upload_original(file, &requested_id, kind).await?;
        let public_id = uploaded.public_id.clone();

        let mut results = vec![MediaVariant {
            size: varia_core::models::ORIGINAL_VARIANT.to_string(),
            url: uploaded.url.clone(),
            file_size: uploaded.bytes,
            format: uploaded.format.clone(),
            width: None,
            height: None,
            bitrate_kbps: None,
            resolution: None,
            created_at: Utc::now(),
        }];

        let mut tasks = JoinSet::new();
        for spec in variants.iter().filter(|s| !s.is_original()).cloned() {
            let adapter = self.clone();
            let id = public_id.clone();
            tasks.spawn(async move {
                let encoding = spec.encoding.clone().ok_or_else(|| {
                    ProviderError::ConfigError(format!(
                        "derived video tier '{}' has no encoding",
                        spec.name
                    ))
                })?;
                let derived = adapter
                    .derive(
                        kind,
                        &id,
                        serde_json::json!({
                            "name": &spec.name,
                            "bitrate_kbps": encoding.bitrate_kbps,
                            "resolution": &encoding.resolution,
                        }),
                    )
                    .await?;
                Ok(MediaVariant {
                    size: spec.name,
                    url: derived.url,
                    file_size: derived.bytes,
                    format: derived.format,
                    width: None,
                    height: None,
                    bitrate_kbps: derived.bitrate_kbps.or(Some(encoding.bitrate_kbps)),
                    resolution: derived.resolution.or(Some(encoding.resolution)),
                    created_at: Utc::now(),
                })
            });
        }

        results.extend(self.join_derive_tasks(tasks, &public_id, kind).await?);

        Ok(ProviderMetadata {
            provider: MediaProvider::ManagedCdn,
            provider_id: public_id,
            format: uploaded.format,
            file_size: uploaded.bytes,
            width: None,
            height: None,
            variants: results,
        })
    }

    async fn delete(&self, provider_id: &str, media_type: MediaType) -> ProviderResult<()> {
        self.delete_resource(provider_id, Self::kind(media_type))
            .await
    }

    async fn describe(
        &self,
        provider_id: &str,
        media_type: MediaType,
    ) -> ProviderResult<serde_json::Value> {
        let response = self
            .client
            .get(self.resource_url(Self::kind(media_type), provider_id))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        Self::parse_response(response).await
    }
}
