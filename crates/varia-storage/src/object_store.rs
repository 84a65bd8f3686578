//! Object-store adapter: raw bucket storage plus local transforms.
//!
//! Unlike the managed CDN, this backend cannot resize anything server-side.
//! Image variants are rendered in-process; video variants are transcoded
//! through ffmpeg inside a scratch directory scoped to the single upload call
//! and removed on every exit path.

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

use varia_core::models::{
    ImageVariantSpec, MediaProvider, MediaType, MediaVariant, VideoVariantSpec,
};
use varia_core::ObjectStoreConfig;
use varia_processing::video::container_format;
use varia_processing::{ImageTransformer, VideoTranscoder};

use crate::compensation::CompensationLog;
use crate::keys;
use crate::traits::{
    ProviderAdapter, ProviderError, ProviderMetadata, ProviderResult, SourceFile,
};

/// Object-store provider adapter
#[derive(Clone)]
pub struct ObjectStoreAdapter {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
    temp_root: PathBuf,
    transcoder: Arc<VideoTranscoder>,
    timeout: Duration,
}

impl ObjectStoreAdapter {
    /// Create an adapter backed by an S3-compatible bucket.
    pub fn new(
        config: &ObjectStoreConfig,
        ffmpeg_path: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone());

        if let Some(ref endpoint) = config.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        let public_base_url = match (&config.public_base_url, &config.endpoint) {
            (Some(base), _) => base.trim_end_matches('/').to_string(),
            // Path-style for S3-compatible providers: {endpoint}/{bucket}
            (None, Some(endpoint)) => {
                format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket)
            }
            (None, None) => format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket, config.region
            ),
        };

        Ok(Self::with_store(
            Arc::new(store),
            public_base_url,
            config
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            ffmpeg_path,
            timeout,
        ))
    }

    /// Build an adapter over an already-constructed store. Used with the
    /// local filesystem backend in tests and single-node deployments.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        public_base_url: impl Into<String>,
        temp_root: PathBuf,
        ffmpeg_path: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into(),
            temp_root,
            transcoder: Arc::new(VideoTranscoder::new(ffmpeg_path.to_string(), timeout)),
            timeout,
        }
    }

    /// Public URL for an object key.
    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    async fn put_object(&self, key: &str, data: Bytes) -> ProviderResult<()> {
        let size = data.len();
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let put = self.store.put(&location, PutPayload::from(data));
        let result: ObjectResult<_> = match tokio::time::timeout(self.timeout, put).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ProviderError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object upload failed"
            );
            ProviderError::UploadFailed(e.to_string())
        })?;

        tracing::debug!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object upload successful"
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> ProviderResult<()> {
        let location = Path::from(key.to_string());
        match self.store.delete(&location).await {
            Ok(()) => Ok(()),
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(key = %key, "Object already absent; delete is a no-op");
                Ok(())
            }
            Err(e) => Err(ProviderError::DeleteFailed(e.to_string())),
        }
    }

    /// Collect fan-out results behind a barrier. The first failure aborts the
    /// remaining siblings; artifacts that did land are deleted through the
    /// compensation log, then the asset prefix is swept for anything a
    /// cancelled task may have written before it was stopped.
    async fn join_variant_tasks(
        &self,
        mut tasks: JoinSet<ProviderResult<(MediaVariant, String)>>,
        provider_id: &str,
        media_type: MediaType,
    ) -> ProviderResult<Vec<MediaVariant>> {
        let mut compensation = CompensationLog::new();
        let mut variants = Vec::new();
        let mut first_error: Option<ProviderError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((variant, key))) => {
                    compensation.push(key);
                    variants.push(variant);
                }
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        tracing::warn!(error = %e, provider_id = %provider_id, "Variant failed; aborting siblings");
                        first_error = Some(e);
                        tasks.abort_all();
                    } else {
                        tracing::debug!(error = %e, "Sibling variant also failed");
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(ProviderError::UploadFailed(format!(
                            "variant task panicked: {}",
                            join_err
                        )));
                        tasks.abort_all();
                    }
                }
            }
        }

        if let Some(e) = first_error {
            let adapter = self.clone();
            compensation
                .run(|key| {
                    let adapter = adapter.clone();
                    async move { adapter.delete_object(&key).await }
                })
                .await;
            if let Err(sweep_err) = self.delete(provider_id, media_type).await {
                tracing::warn!(error = %sweep_err, provider_id = %provider_id, "Prefix sweep after abort failed");
            }
            return Err(e);
        }

        Ok(variants)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ObjectStoreAdapter {
    fn provider(&self) -> MediaProvider {
        MediaProvider::ObjectStore
    }

    async fn upload_image(
        &self,
        file: &SourceFile,
        variants: &[ImageVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        let provider_id = keys::asset_key(folder, Uuid::new_v4());

        let mut tasks = JoinSet::new();
        for spec in variants.iter().cloned() {
            let adapter = self.clone();
            let prefix = provider_id.clone();
            let data = file.data.clone();
            let content_type = file.content_type.clone();

            tasks.spawn(async move {
                let name = spec.name.clone();
                // Decode/resize/encode is CPU-bound; keep it off the async pool.
                let rendered = tokio::task::spawn_blocking(move || {
                    ImageTransformer::render_variant(&data, &spec, &content_type)
                })
                .await
                .map_err(|e| {
                    ProviderError::UploadFailed(format!("image render task failed: {}", e))
                })??;

                let key = keys::variant_key(&prefix, &name, &rendered.format);
                adapter.put_object(&key, rendered.data.clone()).await?;

                let variant = MediaVariant {
                    size: name,
                    url: adapter.object_url(&key),
                    file_size: rendered.data.len() as i64,
                    format: rendered.format,
                    width: Some(rendered.width as i32),
                    height: Some(rendered.height as i32),
                    bitrate_kbps: None,
                    resolution: None,
                    created_at: Utc::now(),
                };
                Ok((variant, key))
            });
        }

        let variants = self
            .join_variant_tasks(tasks, &provider_id, MediaType::Image)
            .await?;

        let original = variants.iter().find(|v| v.is_original());
        Ok(ProviderMetadata {
            provider: MediaProvider::ObjectStore,
            provider_id,
            format: original
                .map(|v| v.format.clone())
                .unwrap_or_else(|| ImageTransformer::detect_format(&file.content_type)),
            file_size: file.size() as i64,
            width: original.and_then(|v| v.width),
            height: original.and_then(|v| v.height),
            variants,
        })
    }

    async fn upload_video(
        &self,
        file: &SourceFile,
        variants: &[VideoVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        let provider_id = keys::asset_key(folder, Uuid::new_v4());
        let container = container_format(&file.content_type);

        // Scratch directory scoped to this one upload; removed on every exit
        // path, including panics, via RAII drop.
        let scratch = tempfile::Builder::new()
            .prefix("varia-upload-")
            .tempdir_in(&self.temp_root)?;
        let input_path = scratch.path().join(format!("source.{}", container));
        tokio::fs::write(&input_path, &file.data).await?;

        let mut tasks = JoinSet::new();
        for spec in variants.iter().cloned() {
            let adapter = self.clone();
            let prefix = provider_id.clone();
            let data = file.data.clone();
            let container = container.clone();
            let input = input_path.clone();
            let scratch_dir = scratch.path().to_path_buf();

            tasks.spawn(async move {
                if spec.encoding.is_none() {
                    // Passthrough: source bytes uploaded verbatim.
                    let key = keys::variant_key(&prefix, &spec.name, &container);
                    adapter.put_object(&key, data.clone()).await?;
                    let variant = MediaVariant {
                        size: spec.name,
                        url: adapter.object_url(&key),
                        file_size: data.len() as i64,
                        format: container,
                        width: None,
                        height: None,
                        bitrate_kbps: None,
                        resolution: None,
                        created_at: Utc::now(),
                    };
                    return Ok((variant, key));
                }

                let transcoded = adapter
                    .transcoder
                    .transcode_variant(&input, &scratch_dir, &spec)
                    .await?;
                let bytes = Bytes::from(tokio::fs::read(&transcoded.path).await?);

                let key = keys::variant_key(&prefix, &spec.name, &transcoded.format);
                adapter.put_object(&key, bytes).await?;

                let encoding = spec.encoding.as_ref();
                let variant = MediaVariant {
                    size: spec.name.clone(),
                    url: adapter.object_url(&key),
                    file_size: transcoded.file_size,
                    format: transcoded.format,
                    width: None,
                    height: None,
                    bitrate_kbps: encoding.map(|e| e.bitrate_kbps),
                    resolution: encoding.map(|e| e.resolution.clone()),
                    created_at: Utc::now(),
                };
                Ok((variant, key))
            });
        }

        let result = self
            .join_variant_tasks(tasks, &provider_id, MediaType::Video)
            .await;

        // Surface scratch removal problems instead of relying on Drop alone.
        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "Failed to remove upload scratch directory");
        }

        let variants = result?;
        let original = variants.iter().find(|v| v.is_original());
        Ok(ProviderMetadata {
            provider: MediaProvider::ObjectStore,
            provider_id,
            format: original
                .map(|v| v.format.clone())
                .unwrap_or(container_format(&file.content_type)),
            file_size: file.size() as i64,
            width: None,
            height: None,
            variants,
        })
    }

    async fn delete(&self, provider_id: &str, _media_type: MediaType) -> ProviderResult<()> {
        let prefix = Path::from(provider_id.to_string());
        let mut objects = self.store.list(Some(&prefix));
        let mut deleted = 0usize;

        while let Some(entry) = objects.next().await {
            match entry {
                Ok(meta) => {
                    self.delete_object(meta.location.as_ref()).await?;
                    deleted += 1;
                }
                Err(ObjectStoreError::NotFound { .. }) => break,
                Err(e) => return Err(ProviderError::DeleteFailed(e.to_string())),
            }
        }

        if deleted == 0 {
            tracing::debug!(provider_id = %provider_id, "No artifacts under prefix; delete is a no-op");
        } else {
            tracing::info!(provider_id = %provider_id, count = deleted, "Deleted provider artifacts");
        }
        Ok(())
    }

    async fn describe(
        &self,
        provider_id: &str,
        _media_type: MediaType,
    ) -> ProviderResult<serde_json::Value> {
        let prefix = Path::from(provider_id.to_string());
        let mut objects = self.store.list(Some(&prefix));
        let mut entries = Vec::new();

        while let Some(entry) = objects.next().await {
            let meta = entry.map_err(|e| ProviderError::UploadFailed(e.to_string()))?;
            entries.push(serde_json::json!({
                "key": meta.location.to_string(),
                "size": meta.size,
                "last_modified": meta.last_modified.to_rfc3339(),
            }));
        }

        if entries.is_empty() {
            return Err(ProviderError::NotFound(provider_id.to_string()));
        }

        Ok(serde_json::json!({
            "provider_id": provider_id,
            "objects": entries,
        }))
    }
}
