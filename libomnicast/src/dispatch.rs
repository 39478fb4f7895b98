//! Dispatch facade: one entry point for publishing to any registered platform

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{OmnicastError, Result};
use crate::platforms::{normalize_id, AdapterRegistry};
use crate::types::{NormalizedPost, PublishReceipt};

/// Looks up an adapter by platform id and forwards the call
///
/// Stateless apart from the shared registry, so it is cheap to clone into
/// the scheduler and the service facade.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<AdapterRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Publish `post` to `platform`
    ///
    /// `platform` is matched case-insensitively, ignoring surrounding spaces.
    ///
    /// # Errors
    ///
    /// - `UnsupportedPlatform` if no adapter is registered under `platform`;
    ///   nothing is sent
    /// - `Adapter(_)` carrying the adapter's own error unchanged
    pub async fn publish(&self, platform: &str, post: &NormalizedPost) -> Result<PublishReceipt> {
        let platform = normalize_id(platform);
        let platform = platform.as_str();
        let adapter = self
            .registry
            .get(platform)
            .ok_or_else(|| OmnicastError::UnsupportedPlatform(platform.to_string()))?;

        debug!(
            platform,
            has_media = post.media_url.is_some(),
            "Dispatching post"
        );

        match adapter.publish(post).await {
            Ok(receipt) => {
                debug!(platform, %receipt, "Publish succeeded");
                Ok(receipt)
            }
            Err(e) => {
                warn!(platform, code = e.code(), error = %e, "Publish failed");
                Err(e.into())
            }
        }
    }
}
