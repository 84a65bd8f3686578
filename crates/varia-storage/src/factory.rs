use std::sync::Arc;
use std::time::Duration;

use varia_core::models::MediaProvider;
use varia_core::PipelineConfig;

use crate::cdn::ManagedCdnAdapter;
use crate::object_store::ObjectStoreAdapter;
use crate::traits::{ProviderAdapter, ProviderError, ProviderResult};

/// Create a provider adapter for the requested backend.
///
/// The provider set is closed; selection happens by enum, and a backend whose
/// credentials are absent from the configuration is a configuration error,
/// not a silent fallback.
pub fn create_adapter(
    config: &PipelineConfig,
    provider: MediaProvider,
) -> ProviderResult<Arc<dyn ProviderAdapter>> {
    let timeout = Duration::from_secs(config.provider_timeout_secs);

    match provider {
        MediaProvider::ManagedCdn => {
            let cdn = config.cdn.clone().ok_or_else(|| {
                ProviderError::ConfigError(
                    "managed-cdn provider requested but CDN credentials are not configured"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(ManagedCdnAdapter::new(cdn, timeout)?))
        }
        MediaProvider::ObjectStore => {
            let store = config.object_store.as_ref().ok_or_else(|| {
                ProviderError::ConfigError(
                    "object-store provider requested but STORE_BUCKET is not configured"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(ObjectStoreAdapter::new(
                store,
                &config.ffmpeg_path,
                timeout,
            )?))
        }
    }
}
