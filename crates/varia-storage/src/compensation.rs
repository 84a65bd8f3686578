//! Compensating cleanup for aborted uploads.
//!
//! There is no cross-provider atomic commit: when one variant fails after
//! siblings already uploaded, the only remedy is to delete what succeeded.
//! Adapters accumulate one entry per uploaded artifact and run the whole log
//! when the overall operation aborts. Cleanup is best-effort: failures are
//! logged, never re-thrown, so the caller sees the one original cause.

use std::future::Future;

use crate::traits::ProviderError;

/// Accumulated cleanup actions for one upload attempt.
#[derive(Debug, Default)]
pub struct CompensationLog {
    entries: Vec<String>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an uploaded artifact that must be deleted if the upload aborts.
    pub fn push(&mut self, key: impl Into<String>) {
        self.entries.push(key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Execute the full log through the adapter's delete primitive. Runs every
    /// entry even when earlier ones fail.
    pub async fn run<F, Fut>(self, mut delete: F)
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        for key in self.entries {
            tracing::debug!(key = %key, "Compensating cleanup: deleting artifact");
            if let Err(e) = delete(key.clone()).await {
                tracing::warn!(key = %key, error = %e, "Compensating cleanup failed");
            }
        }
    }
}
