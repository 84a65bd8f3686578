//! Shared fixtures: a counting mock provider adapter, a failing repository,
//! and media fixtures for pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use varia_core::config::ObjectStoreConfig;
use varia_core::models::{
    default_image_variants, default_video_variants, ImageVariantSpec, MediaAsset, MediaAssetDraft,
    MediaProvider, MediaQuery, MediaStats, MediaType, MediaVariant, VideoVariantSpec,
};
use varia_core::{MediaError, PipelineConfig};
use varia_pipeline::{
    InMemoryMediaRepository, MediaDetailsUpdate, MediaRepository, MediaService, UploadRequest,
};
use varia_processing::{ImageTransformer, TransformError};
use varia_storage::{
    ProviderAdapter, ProviderError, ProviderMetadata, ProviderResult, SourceFile,
};

/// Mock provider adapter with call counters and per-variant failure
/// injection. Mirrors the real adapters' contract: on a variant failure it
/// deletes the sibling artifacts that had already uploaded and returns the
/// first error.
pub struct MockProviderAdapter {
    provider: MediaProvider,
    /// Variant name whose task is made to fail.
    pub fail_variant: Option<String>,
    pub upload_image_calls: AtomicUsize,
    pub upload_video_calls: AtomicUsize,
    /// Artifact keys deleted through cleanup or explicit delete.
    pub deleted: Mutex<Vec<String>>,
    /// Artifact keys uploaded across all calls.
    pub uploaded: Mutex<Vec<String>>,
}

impl MockProviderAdapter {
    pub fn new(provider: MediaProvider) -> Self {
        Self {
            provider,
            fail_variant: None,
            upload_image_calls: AtomicUsize::new(0),
            upload_video_calls: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(provider: MediaProvider, variant: &str) -> Self {
        let mut adapter = Self::new(provider);
        adapter.fail_variant = Some(variant.to_string());
        adapter
    }

    pub fn provider_calls(&self) -> usize {
        self.upload_image_calls.load(Ordering::SeqCst)
            + self.upload_video_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn key(provider_id: &str, size: &str) -> String {
        format!("{}/{}", provider_id, size)
    }

    fn record_upload(&self, key: &str) {
        self.uploaded.lock().unwrap().push(key.to_string());
    }

    /// Simulated abort: delete everything uploaded so far for this asset.
    fn compensate(&self, provider_id: &str) {
        let uploaded: Vec<String> = self
            .uploaded
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(provider_id))
            .cloned()
            .collect();
        self.deleted.lock().unwrap().extend(uploaded);
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    fn provider(&self) -> MediaProvider {
        self.provider
    }

    async fn upload_image(
        &self,
        file: &SourceFile,
        variants: &[ImageVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        self.upload_image_calls.fetch_add(1, Ordering::SeqCst);
        let provider_id = format!("{}/{}", folder, uuid::Uuid::new_v4());
        let (width, height) = ImageTransformer::dimensions(&file.data)
            .map_err(|e| ProviderError::UploadFailed(e.to_string()))?;

        // Sibling tasks are unordered: every healthy variant lands before the
        // injected failure is observed.
        let mut produced = Vec::new();
        for spec in variants
            .iter()
            .filter(|s| self.fail_variant.as_deref() != Some(s.name.as_str()))
        {
            let key = Self::key(&provider_id, &spec.name);
            self.record_upload(&key);
            let variant = match spec.geometry {
                Some(geometry) => MediaVariant {
                    size: spec.name.clone(),
                    url: format!("https://mock.example.com/{}", key),
                    file_size: 1000,
                    format: "jpg".to_string(),
                    width: Some(geometry.width as i32),
                    height: Some(geometry.height as i32),
                    bitrate_kbps: None,
                    resolution: None,
                    created_at: Utc::now(),
                },
                None => MediaVariant {
                    size: spec.name.clone(),
                    url: format!("https://mock.example.com/{}", key),
                    file_size: file.data.len() as i64,
                    format: ImageTransformer::detect_format(&file.content_type),
                    width: Some(width as i32),
                    height: Some(height as i32),
                    bitrate_kbps: None,
                    resolution: None,
                    created_at: Utc::now(),
                },
            };
            produced.push(variant);
        }

        if let Some(failing) = &self.fail_variant {
            if variants.iter().any(|s| &s.name == failing) {
                self.compensate(&provider_id);
                return Err(ProviderError::Transform(TransformError::new(
                    failing.clone(),
                    "simulated transform failure",
                )));
            }
        }

        let original = produced.iter().find(|v| v.is_original());
        Ok(ProviderMetadata {
            provider: self.provider,
            provider_id,
            format: ImageTransformer::detect_format(&file.content_type),
            file_size: file.data.len() as i64,
            width: original.and_then(|v| v.width),
            height: original.and_then(|v| v.height),
            variants: produced,
        })
    }

    async fn upload_video(
        &self,
        file: &SourceFile,
        variants: &[VideoVariantSpec],
        folder: &str,
    ) -> ProviderResult<ProviderMetadata> {
        self.upload_video_calls.fetch_add(1, Ordering::SeqCst);
        let provider_id = format!("{}/{}", folder, uuid::Uuid::new_v4());

        let mut produced = Vec::new();
        for spec in variants
            .iter()
            .filter(|s| self.fail_variant.as_deref() != Some(s.name.as_str()))
        {
            let key = Self::key(&provider_id, &spec.name);
            self.record_upload(&key);
            let encoding = spec.encoding.as_ref();
            produced.push(MediaVariant {
                size: spec.name.clone(),
                url: format!("https://mock.example.com/{}", key),
                file_size: if spec.is_original() {
                    file.data.len() as i64
                } else {
                    5000
                },
                format: "mp4".to_string(),
                width: None,
                height: None,
                bitrate_kbps: encoding.map(|e| e.bitrate_kbps),
                resolution: encoding.map(|e| e.resolution.clone()),
                created_at: Utc::now(),
            });
        }

        if let Some(failing) = &self.fail_variant {
            if variants.iter().any(|s| &s.name == failing) {
                self.compensate(&provider_id);
                return Err(ProviderError::Transform(TransformError::new(
                    failing.clone(),
                    "simulated transcode failure",
                )));
            }
        }

        Ok(ProviderMetadata {
            provider: self.provider,
            provider_id,
            format: "mp4".to_string(),
            file_size: file.data.len() as i64,
            width: None,
            height: None,
            variants: produced,
        })
    }

    async fn delete(&self, provider_id: &str, _media_type: MediaType) -> ProviderResult<()> {
        self.deleted.lock().unwrap().push(provider_id.to_string());
        Ok(())
    }

    async fn describe(
        &self,
        provider_id: &str,
        _media_type: MediaType,
    ) -> ProviderResult<serde_json::Value> {
        Ok(serde_json::json!({ "provider_id": provider_id }))
    }
}

/// Repository whose create always fails, for persistence-failure paths.
pub struct FailingRepository;

#[async_trait]
impl MediaRepository for FailingRepository {
    async fn create(&self, _draft: MediaAssetDraft) -> Result<MediaAsset, MediaError> {
        Err(MediaError::Persistence(
            "simulated metadata write failure".to_string(),
        ))
    }

    async fn get(&self, _id: uuid::Uuid) -> Result<Option<MediaAsset>, MediaError> {
        Ok(None)
    }

    async fn list(&self, _query: &MediaQuery) -> Result<Vec<MediaAsset>, MediaError> {
        Ok(Vec::new())
    }

    async fn update_details(
        &self,
        id: uuid::Uuid,
        _update: MediaDetailsUpdate,
    ) -> Result<MediaAsset, MediaError> {
        Err(MediaError::NotFound(format!("media {} not found", id)))
    }

    async fn delete(&self, _id: uuid::Uuid) -> Result<bool, MediaError> {
        Ok(false)
    }

    async fn stats(&self) -> Result<MediaStats, MediaError> {
        Ok(MediaStats {
            total: 0,
            images: 0,
            videos: 0,
            total_size_bytes: 0,
            by_provider: HashMap::new(),
        })
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        environment: "test".to_string(),
        default_provider: MediaProvider::ObjectStore,
        max_image_size_bytes: 10 * 1024 * 1024,
        max_video_size_bytes: 100 * 1024 * 1024,
        image_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ],
        video_content_types: vec!["video/mp4".to_string()],
        image_variants: default_image_variants(),
        video_variants: default_video_variants(),
        provider_timeout_secs: 30,
        ffmpeg_path: "ffmpeg".to_string(),
        database_url: None,
        cdn: None,
        object_store: Some(ObjectStoreConfig {
            bucket: "media".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            public_base_url: None,
            temp_dir: None,
        }),
    }
}

/// Service + handles to its mock adapter and in-memory repository.
pub struct TestHarness {
    pub service: MediaService,
    pub adapter: Arc<MockProviderAdapter>,
    pub repository: Arc<InMemoryMediaRepository>,
}

pub fn harness_with_adapter(adapter: MockProviderAdapter) -> TestHarness {
    let config = test_config();
    let adapter = Arc::new(adapter);
    let repository = Arc::new(InMemoryMediaRepository::new());

    let mut adapters: HashMap<MediaProvider, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        adapter.provider(),
        adapter.clone() as Arc<dyn ProviderAdapter>,
    );

    TestHarness {
        service: MediaService::new(
            &config,
            repository.clone() as Arc<dyn MediaRepository>,
            adapters,
        ),
        adapter,
        repository,
    }
}

pub fn harness() -> TestHarness {
    harness_with_adapter(MockProviderAdapter::new(MediaProvider::ObjectStore))
}

/// Encode a real JPEG so dimension probing works end to end.
pub fn jpeg_fixture(width: u32, height: u32) -> Bytes {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 120])
    }));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(buffer)
}

pub fn image_request(data: Bytes) -> UploadRequest {
    UploadRequest::new(data, "image/jpeg", "photo.jpg")
}

pub fn video_request() -> UploadRequest {
    UploadRequest::new(
        Bytes::from(vec![0u8; 64 * 1024]),
        "video/mp4",
        "clip.mp4",
    )
}
