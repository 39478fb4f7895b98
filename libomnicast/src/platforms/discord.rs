//! Discord webhook adapter
//!
//! The webhook URL is itself the credential, so it lives in `tokens`.
//! `?wait=true` makes Discord return the created message.
//!
//! Required: `tokens.webhook_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "discord";

pub struct DiscordAdapter {
    client: Client,
}

impl DiscordAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct WebhookMessage {
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

#[derive(Serialize)]
struct Embed {
    image: EmbedImage,
}

#[derive(Serialize)]
struct EmbedImage {
    url: String,
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

#[async_trait]
impl Adapter for DiscordAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Channel webhook; media is shown as an image embed",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let webhook_url = post.require_token("webhook_url")?;

        let embeds = post
            .media_url
            .iter()
            .map(|url| Embed {
                image: EmbedImage { url: url.clone() },
            })
            .collect();
        let message = WebhookMessage {
            content: post.text_with_hashtags(),
            embeds,
        };

        let request = self
            .client
            .post(webhook_url)
            .query(&[("wait", "true")])
            .json(&message);

        let created: CreatedMessage = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(created.id))
    }
}
