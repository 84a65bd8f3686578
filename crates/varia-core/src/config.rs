//! Configuration module
//!
//! Configuration for the upload pipeline and both provider backends. Values
//! come from the environment with typed defaults; provider credentials are
//! opaque to the pipeline and passed through to the adapter that needs them.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{
    default_image_variants, default_video_variants, validate_tier_names, ImageVariantSpec,
    MediaProvider, VideoVariantSpec,
};

const MAX_IMAGE_SIZE_MB: usize = 10;
const MAX_VIDEO_SIZE_MB: usize = 500;
const PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Credentials for the managed image/video CDN backend.
///
/// Constructed once at startup and handed to the adapter; there is no
/// module-level client state.
#[derive(Clone, Debug)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API root, e.g. `https://api.cdn.example.com`.
    pub base_url: String,
}

/// Settings for the raw object-store backend.
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub endpoint: Option<String>,
    /// Public base URL for serving objects; derived from bucket/region when absent.
    pub public_base_url: Option<String>,
    /// Root for per-upload scratch directories; system temp dir when absent.
    pub temp_dir: Option<PathBuf>,
}

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub environment: String,
    pub default_provider: MediaProvider,
    pub max_image_size_bytes: usize,
    pub max_video_size_bytes: usize,
    pub image_content_types: Vec<String>,
    pub video_content_types: Vec<String>,
    pub image_variants: Vec<ImageVariantSpec>,
    pub video_variants: Vec<VideoVariantSpec>,
    /// Upper bound on each provider call and each transcoder invocation.
    pub provider_timeout_secs: u64,
    pub ffmpeg_path: String,
    pub database_url: Option<String>,
    pub cdn: Option<CdnConfig>,
    pub object_store: Option<ObjectStoreConfig>,
}

impl PipelineConfig {
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let default_provider = match env::var("DEFAULT_PROVIDER") {
            Ok(s) => MediaProvider::from_str(&s).map_err(|e| anyhow::anyhow!(e))?,
            Err(_) => MediaProvider::ManagedCdn,
        };

        let max_image_size_bytes = env::var("MAX_IMAGE_SIZE_MB")
            .unwrap_or_else(|_| MAX_IMAGE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_IMAGE_SIZE_MB)
            * 1024
            * 1024;

        let max_video_size_bytes = env::var("MAX_VIDEO_SIZE_MB")
            .unwrap_or_else(|_| MAX_VIDEO_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_VIDEO_SIZE_MB)
            * 1024
            * 1024;

        let image_content_types = parse_list(
            env::var("IMAGE_CONTENT_TYPES")
                .unwrap_or_else(|_| "image/jpeg,image/png,image/gif,image/webp".to_string()),
        );

        let video_content_types = parse_list(
            env::var("VIDEO_CONTENT_TYPES")
                .unwrap_or_else(|_| "video/mp4,video/webm,video/quicktime".to_string()),
        );

        let image_variants = select_tiers(
            default_image_variants(),
            env::var("IMAGE_VARIANTS").ok(),
            |v| v.name.clone(),
        );
        let video_variants = select_tiers(
            default_video_variants(),
            env::var("VIDEO_VARIANTS").ok(),
            |v| v.name.clone(),
        );

        let provider_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| PROVIDER_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(PROVIDER_TIMEOUT_SECS);

        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());

        let cdn = match (
            env::var("CDN_CLOUD_NAME").ok(),
            env::var("CDN_API_KEY").ok(),
            env::var("CDN_API_SECRET").ok(),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CdnConfig {
                base_url: env::var("CDN_BASE_URL")
                    .unwrap_or_else(|_| "https://api.cdn.example.com".to_string()),
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let object_store = env::var("STORE_BUCKET").ok().map(|bucket| ObjectStoreConfig {
            bucket,
            region: env::var("STORE_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("STORE_ENDPOINT").ok(),
            public_base_url: env::var("STORE_PUBLIC_URL").ok(),
            temp_dir: env::var("STORE_TEMP_DIR").ok().map(PathBuf::from),
        });

        let config = PipelineConfig {
            environment,
            default_provider,
            max_image_size_bytes,
            max_video_size_bytes,
            image_content_types,
            video_content_types,
            image_variants,
            video_variants,
            provider_timeout_secs,
            ffmpeg_path,
            database_url: env::var("DATABASE_URL").ok(),
            cdn,
            object_store,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validate_tier_names(
            self.image_variants
                .iter()
                .map(|v| (v.name.as_str(), v.is_original())),
        )
        .map_err(|e| anyhow::anyhow!("image variant table: {}", e))?;

        validate_tier_names(
            self.video_variants
                .iter()
                .map(|v| (v.name.as_str(), v.is_original())),
        )
        .map_err(|e| anyhow::anyhow!("video variant table: {}", e))?;

        match self.default_provider {
            MediaProvider::ManagedCdn if self.cdn.is_none() => Err(anyhow::anyhow!(
                "DEFAULT_PROVIDER is managed-cdn but CDN_CLOUD_NAME/CDN_API_KEY/CDN_API_SECRET are not set"
            )),
            MediaProvider::ObjectStore if self.object_store.is_none() => Err(anyhow::anyhow!(
                "DEFAULT_PROVIDER is object-store but STORE_BUCKET is not set"
            )),
            _ => Ok(()),
        }
    }
}

fn parse_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Restrict a default tier table to the names listed in the env override.
/// The passthrough tier is always retained; unknown names are ignored.
fn select_tiers<T, F>(defaults: Vec<T>, selection: Option<String>, name_of: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    match selection {
        None => defaults,
        Some(raw) => {
            let wanted: Vec<String> = parse_list(raw);
            defaults
                .into_iter()
                .filter(|tier| {
                    let name = name_of(tier);
                    name == crate::models::ORIGINAL_VARIANT || wanted.contains(&name)
                })
                .collect()
        }
    }
}
