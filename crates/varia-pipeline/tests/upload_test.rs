//! Upload pipeline scenarios: variant fan-out, validation short-circuit,
//! abort-and-cleanup atomicity, and persistence-failure handling.

mod helpers;

use std::sync::Arc;

use helpers::{
    harness, harness_with_adapter, image_request, jpeg_fixture, test_config, video_request,
    FailingRepository, MockProviderAdapter,
};
use varia_core::models::{MediaProvider, MediaType, ORIGINAL_VARIANT};
use varia_core::MediaError;
use varia_pipeline::{MediaRepository, MediaService};

#[tokio::test]
async fn test_image_upload_produces_all_variants() {
    let h = harness();
    let data = jpeg_fixture(1600, 900);

    let asset = h.service.upload_media(image_request(data)).await.unwrap();

    assert_eq!(asset.variants.len(), 5);
    assert_eq!(asset.media_type, MediaType::Image);

    // Exactly one original; its dimensions are promoted to the asset level.
    let originals: Vec<_> = asset.variants.iter().filter(|v| v.is_original()).collect();
    assert_eq!(originals.len(), 1);
    assert_eq!(originals[0].width, Some(1600));
    assert_eq!(originals[0].height, Some(900));
    assert_eq!(asset.width, Some(1600));
    assert_eq!(asset.height, Some(900));

    // Derived tiers carry their scaled geometry.
    let thumb = asset.variants.iter().find(|v| v.size == "thumbnail").unwrap();
    assert_eq!((thumb.width, thumb.height), (Some(150), Some(150)));

    // No two variants share a size label.
    let mut sizes: Vec<&str> = asset.variants.iter().map(|v| v.size.as_str()).collect();
    sizes.sort();
    sizes.dedup();
    assert_eq!(sizes.len(), 5);

    // The record actually reached the repository.
    assert_eq!(h.repository.len(), 1);
}

#[tokio::test]
async fn test_unsupported_mime_type_fails_before_any_provider_work() {
    let h = harness();
    let mut request = image_request(jpeg_fixture(100, 100));
    request.content_type = "application/pdf".to_string();
    request.original_name = "menu.pdf".to_string();

    let err = h.service.upload_media(request).await.unwrap_err();

    assert!(matches!(err, MediaError::Validation(_)));
    assert_eq!(h.adapter.provider_calls(), 0, "no provider calls expected");
    assert!(h.repository.is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let h = harness();
    let mut request = image_request(jpeg_fixture(100, 100));
    request.data = bytes::Bytes::from(vec![0u8; 11 * 1024 * 1024]);

    let err = h.service.upload_media(request).await.unwrap_err();
    assert!(matches!(err, MediaError::Validation(_)));
    assert_eq!(h.adapter.provider_calls(), 0);
}

#[tokio::test]
async fn test_video_tier_failure_persists_nothing_and_cleans_up() {
    let h = harness_with_adapter(MockProviderAdapter::failing_on(
        MediaProvider::ObjectStore,
        "high",
    ));

    let err = h.service.upload_media(video_request()).await.unwrap_err();

    match err {
        MediaError::UploadFailed { source, .. } => {
            assert!(source.to_string().contains("high"));
        }
        other => panic!("expected UploadFailed, got {:?}", other),
    }

    // No partial asset.
    assert!(h.repository.is_empty());

    // Every artifact that had uploaded before the failure was deleted.
    let deleted = h.adapter.deleted_keys();
    assert_eq!(deleted.len(), 3);
    for tier in ["low", "medium", ORIGINAL_VARIANT] {
        assert!(
            deleted.iter().any(|k| k.ends_with(tier)),
            "expected cleanup of '{}' artifact, got {:?}",
            tier,
            deleted
        );
    }
}

#[tokio::test]
async fn test_image_tier_failure_is_atomic() {
    let h = harness_with_adapter(MockProviderAdapter::failing_on(
        MediaProvider::ObjectStore,
        "large",
    ));

    let err = h
        .service
        .upload_media(image_request(jpeg_fixture(800, 600)))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::UploadFailed { .. }));
    assert!(h.repository.is_empty());
    // thumbnail/small/medium/original all uploaded before "large" failed.
    assert_eq!(h.adapter.deleted_keys().len(), 4);
}

#[tokio::test]
async fn test_upload_failure_masks_cause_and_carries_correlation_id() {
    use varia_core::ErrorMetadata;

    let h = harness_with_adapter(MockProviderAdapter::failing_on(
        MediaProvider::ObjectStore,
        "medium",
    ));

    let err = h
        .service
        .upload_media(image_request(jpeg_fixture(400, 400)))
        .await
        .unwrap_err();

    assert_eq!(err.http_status_code(), 400);
    let msg = err.client_message();
    assert!(msg.starts_with("Upload failed"));
    assert!(!msg.contains("simulated"), "provider detail leaked: {}", msg);
}

#[tokio::test]
async fn test_persistence_failure_is_distinct_and_skips_cleanup() {
    let config = test_config();
    let adapter = Arc::new(MockProviderAdapter::new(MediaProvider::ObjectStore));
    let mut adapters = std::collections::HashMap::new();
    adapters.insert(
        MediaProvider::ObjectStore,
        adapter.clone() as Arc<dyn varia_storage::ProviderAdapter>,
    );
    let service = MediaService::new(
        &config,
        Arc::new(FailingRepository) as Arc<dyn MediaRepository>,
        adapters,
    );

    let err = service
        .upload_media(image_request(jpeg_fixture(200, 200)))
        .await
        .unwrap_err();

    // Surfaced distinctly so the caller can retry persistence...
    assert!(matches!(err, MediaError::Persistence(_)));
    // ...and the uploaded artifacts are deliberately left in place.
    assert!(adapter.deleted_keys().is_empty());
    assert_eq!(adapter.provider_calls(), 1);
}

#[tokio::test]
async fn test_caller_metadata_is_attached() {
    let h = harness();
    let mut request = image_request(jpeg_fixture(300, 300));
    request.title = Some("Lunch special".to_string());
    request.tags = vec!["menu".to_string(), "pasta".to_string()];
    let owner = uuid::Uuid::new_v4();
    request.user_id = Some(owner);

    let asset = h.service.upload_media(request).await.unwrap();

    assert_eq!(asset.title.as_deref(), Some("Lunch special"));
    assert_eq!(asset.description, None);
    assert_eq!(asset.tags, vec!["menu", "pasta"]);
    assert_eq!(asset.user_id, Some(owner));
}

#[tokio::test]
async fn test_filename_is_sanitized_before_persistence() {
    let h = harness();
    let mut request = image_request(jpeg_fixture(100, 100));
    request.original_name = "week menu (draft).jpg".to_string();

    let asset = h.service.upload_media(request).await.unwrap();
    assert_eq!(asset.original_name, "week_menu__draft_.jpg");
}
