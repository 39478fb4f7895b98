//! Medium adapter
//!
//! Required: `tokens.integration_token`, `account.author_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "medium";
const DEFAULT_BASE_URL: &str = "https://api.medium.com";
const MAX_TAGS: usize = 5;

pub struct MediumAdapter {
    client: Client,
    base_url: String,
}

impl MediumAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStory {
    title: String,
    content_format: &'static str,
    content: String,
    tags: Vec<String>,
    publish_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical_url: Option<String>,
}

#[derive(Deserialize)]
struct StoryEnvelope {
    data: Story,
}

#[derive(Deserialize)]
struct Story {
    id: String,
}

fn story(post: &NormalizedPost) -> CreateStory {
    let title = post
        .text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Untitled")
        .to_string();

    let mut content = post.text.clone();
    if let Some(url) = post.media_url.as_deref() {
        let alt = post.alt.as_deref().unwrap_or_default();
        content.push_str(&format!("\n\n![{}]({})", alt, url));
    }

    CreateStory {
        title,
        content_format: "markdown",
        content,
        tags: post
            .hashtags
            .iter()
            .map(|tag| tag.trim_start_matches('#').to_string())
            .take(MAX_TAGS)
            .collect(),
        publish_status: "public",
        canonical_url: post.link_url.clone(),
    }
}

#[async_trait]
impl Adapter for MediumAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: false,
            analytics: false,
            note: "Markdown stories; images are referenced inline by URL",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("integration_token")?;
        let author_id = post.require_account("author_id")?;
        if post.text.trim().is_empty() {
            return Err(AdapterError::MissingField("text".to_string()));
        }

        let request = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &["v1", "users", author_id, "posts"])?)
            .bearer_auth(token)
            .json(&story(post));

        let envelope: StoryEnvelope = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(envelope.data.id))
    }
}
