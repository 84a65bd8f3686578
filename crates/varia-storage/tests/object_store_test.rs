//! Object-store adapter integration tests over the local filesystem backend:
//! full variant fan-out, idempotent delete, and the scoped scratch-directory
//! guarantee on both success and failure paths.

use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, ObjectStoreExt};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use varia_core::models::{
    default_image_variants, default_video_variants, MediaType, VideoVariantSpec, ORIGINAL_VARIANT,
};
use varia_storage::{ObjectStoreAdapter, ProviderAdapter, ProviderError, SourceFile};

struct Fixture {
    adapter: ObjectStoreAdapter,
    store: Arc<LocalFileSystem>,
    temp_root: std::path::PathBuf,
    _bucket_dir: tempfile::TempDir,
    _temp_dir: tempfile::TempDir,
}

fn fixture(ffmpeg_path: &str) -> Fixture {
    let bucket_dir = tempfile::tempdir().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalFileSystem::new_with_prefix(bucket_dir.path()).unwrap());

    let adapter = ObjectStoreAdapter::with_store(
        store.clone(),
        "http://localhost:9000/media-test",
        temp_dir.path().to_path_buf(),
        ffmpeg_path,
        Duration::from_secs(30),
    );

    Fixture {
        adapter,
        store,
        temp_root: temp_dir.path().to_path_buf(),
        _bucket_dir: bucket_dir,
        _temp_dir: temp_dir,
    }
}

fn png_file(width: u32, height: u32) -> SourceFile {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([80, 120, 200]),
    ));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    SourceFile {
        data: Bytes::from(buffer),
        original_name: "photo.png".to_string(),
        content_type: "image/png".to_string(),
    }
}

fn video_file() -> SourceFile {
    SourceFile {
        data: Bytes::from(vec![0u8; 32 * 1024]),
        original_name: "clip.mp4".to_string(),
        content_type: "video/mp4".to_string(),
    }
}

fn scratch_entries(temp_root: &std::path::Path) -> usize {
    std::fs::read_dir(temp_root).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_image_upload_stores_every_variant() {
    let f = fixture("ffmpeg");
    let metadata = f
        .adapter
        .upload_image(&png_file(640, 480), &default_image_variants(), "media")
        .await
        .unwrap();

    assert_eq!(metadata.variants.len(), 5);
    assert_eq!(metadata.width, Some(640));
    assert_eq!(metadata.height, Some(480));
    assert_eq!(metadata.format, "png");

    // The passthrough kept its container; derived tiers are JPEG.
    let original = metadata
        .variants
        .iter()
        .find(|v| v.is_original())
        .unwrap();
    assert_eq!(original.format, "png");
    assert!(metadata
        .variants
        .iter()
        .filter(|v| !v.is_original())
        .all(|v| v.format == "jpg"));

    // Every artifact is really in the store.
    for variant in &metadata.variants {
        let key = format!(
            "{}/{}.{}",
            metadata.provider_id, variant.size, variant.format
        );
        assert!(
            f.store.head(&ObjectPath::from(key.clone())).await.is_ok(),
            "missing object {}",
            key
        );
        assert!(variant.url.ends_with(&key));
    }
}

#[tokio::test]
async fn test_delete_removes_all_artifacts_and_is_idempotent() {
    let f = fixture("ffmpeg");
    let metadata = f
        .adapter
        .upload_image(&png_file(320, 240), &default_image_variants(), "media")
        .await
        .unwrap();

    f.adapter
        .delete(&metadata.provider_id, MediaType::Image)
        .await
        .unwrap();

    let err = f
        .adapter
        .describe(&metadata.provider_id, MediaType::Image)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));

    // Deleting again is a logged no-op, never an error.
    f.adapter
        .delete(&metadata.provider_id, MediaType::Image)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_video_passthrough_upload_cleans_scratch_dir() {
    let f = fixture("ffmpeg");
    // Only the passthrough tier: no transcoder involved.
    let variants = vec![VideoVariantSpec {
        name: ORIGINAL_VARIANT.to_string(),
        encoding: None,
    }];

    let metadata = f
        .adapter
        .upload_video(&video_file(), &variants, "media")
        .await
        .unwrap();

    assert_eq!(metadata.variants.len(), 1);
    assert_eq!(metadata.variants[0].format, "mp4");
    assert_eq!(
        scratch_entries(&f.temp_root),
        0,
        "scratch directory leaked on the success path"
    );
}

#[tokio::test]
async fn test_failed_video_upload_cleans_scratch_and_artifacts() {
    // A transcoder that cannot start makes every derived tier fail.
    let f = fixture("/nonexistent/ffmpeg");

    let err = f
        .adapter
        .upload_video(&video_file(), &default_video_variants(), "media")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Transform(_) | ProviderError::UploadFailed(_)
    ));

    // The scoped scratch directory is gone even on the failure path.
    assert_eq!(
        scratch_entries(&f.temp_root),
        0,
        "scratch directory leaked on the failure path"
    );

    // The passthrough artifact that may have uploaded before the abort was
    // compensated away: nothing is left in the store.
    let mut listing = f.store.list(None);
    use futures::StreamExt;
    let mut leftover = Vec::new();
    while let Some(entry) = listing.next().await {
        leftover.push(entry.unwrap().location.to_string());
    }
    assert!(leftover.is_empty(), "leaked artifacts: {:?}", leftover);
}

#[tokio::test]
async fn test_describe_reports_provider_native_listing() {
    let f = fixture("ffmpeg");
    let metadata = f
        .adapter
        .upload_image(&png_file(200, 200), &default_image_variants(), "gallery")
        .await
        .unwrap();

    let info = f
        .adapter
        .describe(&metadata.provider_id, MediaType::Image)
        .await
        .unwrap();

    assert_eq!(info["provider_id"], metadata.provider_id.as_str());
    assert_eq!(info["objects"].as_array().unwrap().len(), 5);
}
