//! Threads adapter (Threads API)
//!
//! Same container-then-publish flow as Instagram, but text-only posts are
//! allowed.
//!
//! Required: `tokens.access_token`, `account.threads_user_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "threads";
const DEFAULT_BASE_URL: &str = "https://graph.threads.net/v1.0";

pub struct ThreadsAdapter {
    client: Client,
    base_url: String,
}

impl ThreadsAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct ThreadsId {
    id: String,
}

#[async_trait]
impl Adapter for ThreadsAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: true,
            note: "Text or single image; image must be publicly reachable",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let user_id = post.require_account("threads_user_id")?;
        let text = post.text_with_hashtags();

        let mut params = vec![("text", text.as_str()), ("access_token", token)];
        match post.media_url.as_deref() {
            Some(image_url) => {
                params.push(("media_type", "IMAGE"));
                params.push(("image_url", image_url));
            }
            None => {
                if text.is_empty() {
                    return Err(AdapterError::MissingField("text".to_string()));
                }
                params.push(("media_type", "TEXT"));
            }
        }

        let create = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &[user_id, "threads"])?)
            .query(&params);
        let container: ThreadsId = http::send_json(PLATFORM, create).await?;

        let publish = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &[user_id, "threads_publish"])?)
            .query(&[("creation_id", container.id.as_str()), ("access_token", token)]);
        let published: ThreadsId = http::send_json(PLATFORM, publish).await?;

        Ok(PublishReceipt::Id(published.id))
    }
}
