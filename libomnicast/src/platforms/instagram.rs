//! Instagram adapter (Instagram Graph API, business accounts)
//!
//! Publishing is two calls: create a media container from a public image URL,
//! then publish the container. Instagram has no text-only posts, so a media
//! URL is required.
//!
//! Required: `tokens.access_token`, `account.ig_user_id`, `media_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::facebook::GRAPH_BASE_URL;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "instagram";

pub struct InstagramAdapter {
    client: Client,
    base_url: String,
}

impl InstagramAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, GRAPH_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct GraphId {
    id: String,
}

#[async_trait]
impl Adapter for InstagramAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: true,
            note: "Business accounts only; every post needs a public image URL",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let user_id = post.require_account("ig_user_id")?;
        let image_url = post.require_media()?;
        let caption = post.text_with_hashtags();

        let create = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &[user_id, "media"])?)
            .query(&[
                ("image_url", image_url),
                ("caption", caption.as_str()),
                ("access_token", token),
            ]);
        let container: GraphId = http::send_json(PLATFORM, create).await?;
        tracing::debug!(platform = PLATFORM, container = %container.id, "Media container created");

        let publish = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &[user_id, "media_publish"])?)
            .query(&[("creation_id", container.id.as_str()), ("access_token", token)]);
        let published: GraphId = http::send_json(PLATFORM, publish).await?;

        Ok(PublishReceipt::Id(published.id))
    }
}
