//! Platform adapters and the registry that maps platform ids to them
//!
//! Every supported network is one [`Adapter`] implementation. An adapter turns
//! a [`NormalizedPost`] into that network's API call and reduces the response
//! to a [`PublishReceipt`]. Adapters share nothing but the injected
//! `reqwest::Client`, so an outage or bug in one integration cannot leak into
//! another.
//!
//! # Preconditions
//!
//! Adapters check their required `tokens` and `account` keys (and media, where
//! the platform needs it) before touching the network. A missing key fails
//! with `missing_credential` / `missing_field` and has no side effects.
//!
//! # Unsupported platforms
//!
//! Platforms without a usable public posting API are still registered. Their
//! capability record says `post: false` and their adapter always fails with
//! `not_supported`. The registry never gates calls by capability.
//!
//! # Examples
//!
//! ```no_run
//! use libomnicast::platforms::AdapterRegistry;
//! use libomnicast::types::NormalizedPost;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = AdapterRegistry::with_defaults(reqwest::Client::new());
//! let adapter = registry.get("telegram").expect("telegram is registered");
//!
//! let post = NormalizedPost::new("Hello from omnicast")
//!     .with_token("bot_token", "123:abc")
//!     .with_account("chat_id", "@my_channel");
//! let receipt = adapter.publish(&post).await?;
//! println!("{}", receipt);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AdapterError;
use crate::types::{AdapterInfo, Capabilities, NormalizedPost, PublishReceipt};

pub mod bluesky;
pub mod discord;
pub mod facebook;
pub mod google_business;
pub mod instagram;
pub mod linkedin;
pub mod mastodon;
pub mod medium;
pub mod pinterest;
pub mod reddit;
pub mod slack;
pub mod telegram;
pub mod threads;
pub mod tumblr;
pub mod unsupported;
pub mod whatsapp;
pub mod wordpress;
pub mod x;

// Mock adapter is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Canonical form of a platform id: trimmed and lowercase
pub fn normalize_id(platform: &str) -> String {
    platform.trim().to_lowercase()
}

/// One platform integration
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Registry key, lowercase (e.g. "telegram", "google_business")
    fn id(&self) -> &str;

    /// Static capability record; must agree with `publish` behavior
    fn capabilities(&self) -> Capabilities;

    /// Publish one post
    ///
    /// # Errors
    ///
    /// - `MissingCredential` / `MissingField` when a required key is absent,
    ///   before any network call
    /// - `NotSupported` for platforms this integration does not post to
    /// - `Upstream` when the platform call itself fails
    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError>;
}

/// Lookup table from platform id to adapter
///
/// Built once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in adapter sharing `client`
    pub fn with_defaults(client: Client) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(telegram::TelegramAdapter::new(client.clone())));
        registry.register(Arc::new(discord::DiscordAdapter::new(client.clone())));
        registry.register(Arc::new(slack::SlackAdapter::new(client.clone())));
        registry.register(Arc::new(x::XAdapter::new(client.clone())));
        registry.register(Arc::new(facebook::FacebookAdapter::new(client.clone())));
        registry.register(Arc::new(instagram::InstagramAdapter::new(client.clone())));
        registry.register(Arc::new(threads::ThreadsAdapter::new(client.clone())));
        registry.register(Arc::new(linkedin::LinkedInAdapter::new(client.clone())));
        registry.register(Arc::new(pinterest::PinterestAdapter::new(client.clone())));
        registry.register(Arc::new(reddit::RedditAdapter::new(client.clone())));
        registry.register(Arc::new(mastodon::MastodonAdapter::new(client.clone())));
        registry.register(Arc::new(bluesky::BlueskyAdapter::new(client.clone())));
        registry.register(Arc::new(tumblr::TumblrAdapter::new(client.clone())));
        registry.register(Arc::new(wordpress::WordPressAdapter::new(client.clone())));
        registry.register(Arc::new(medium::MediumAdapter::new(client.clone())));
        registry.register(Arc::new(google_business::GoogleBusinessAdapter::new(
            client.clone(),
        )));
        registry.register(Arc::new(whatsapp::WhatsAppAdapter::new(client)));

        for adapter in unsupported::all() {
            registry.register(Arc::new(adapter));
        }

        registry
    }

    /// Register an adapter under its id, returning any adapter it replaced
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Option<Arc<dyn Adapter>> {
        self.adapters.insert(adapter.id().to_string(), adapter)
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(platform).cloned()
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.adapters.contains_key(platform)
    }

    pub fn capabilities(&self, platform: &str) -> Option<Capabilities> {
        self.adapters.get(platform).map(|a| a.capabilities())
    }

    /// Capability table, sorted by platform id
    pub fn list(&self) -> Vec<AdapterInfo> {
        self.adapters
            .iter()
            .map(|(id, adapter)| AdapterInfo {
                platform: id.clone(),
                capabilities: adapter.capabilities(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::MockAdapter;

    fn defaults() -> AdapterRegistry {
        AdapterRegistry::with_defaults(Client::new())
    }

    #[test]
    fn test_default_registry_has_twenty_platforms() {
        let registry = defaults();
        assert_eq!(registry.len(), 20);

        for id in [
            "telegram",
            "discord",
            "slack",
            "x",
            "facebook",
            "instagram",
            "threads",
            "linkedin",
            "pinterest",
            "reddit",
            "mastodon",
            "bluesky",
            "tumblr",
            "wordpress",
            "medium",
            "google_business",
            "whatsapp",
            "youtube",
            "tiktok",
            "snapchat",
        ] {
            assert!(registry.contains(id), "missing adapter: {}", id);
        }
    }

    #[test]
    fn test_list_is_sorted() {
        let list = defaults().list();
        let ids: Vec<&str> = list.iter().map(|i| i.platform.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_unknown_platform_lookup() {
        let registry = defaults();
        assert!(registry.get("myspace").is_none());
        assert!(registry.capabilities("myspace").is_none());
    }

    #[tokio::test]
    async fn test_post_false_adapters_always_not_supported() {
        let registry = defaults();

        for info in registry.list().into_iter().filter(|i| !i.capabilities.post) {
            let adapter = registry.get(&info.platform).unwrap();
            let post = NormalizedPost::new("hello")
                .with_media("https://cdn.example.com/a.mp4")
                .with_token("access_token", "t");

            let err = adapter.publish(&post).await.unwrap_err();
            assert_eq!(err.code(), "not_supported", "platform {}", info.platform);
            assert_eq!(err.status_hint(), 501);
        }
    }

    #[tokio::test]
    async fn test_every_adapter_fails_fast_without_credentials() {
        // With empty tokens/account no adapter may reach the network, so the
        // only acceptable failures are precondition ones.
        let registry = defaults();

        for info in registry.list() {
            let adapter = registry.get(&info.platform).unwrap();
            let post = NormalizedPost::new("hello").with_media("https://cdn.example.com/a.png");

            let err = adapter.publish(&post).await.unwrap_err();
            let code = err.code();
            assert!(
                matches!(code, "missing_credential" | "missing_field" | "not_supported"),
                "{} failed with {}",
                info.platform,
                code
            );
            if info.capabilities.post {
                assert_ne!(code, "not_supported", "{} claims post support", info.platform);
            }
        }
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = defaults();
        let previous = registry.register(Arc::new(MockAdapter::success("telegram")));

        assert!(previous.is_some());
        assert_eq!(registry.len(), 20);
        assert_eq!(
            registry.capabilities("telegram").unwrap().note,
            MockAdapter::NOTE
        );
    }
}
