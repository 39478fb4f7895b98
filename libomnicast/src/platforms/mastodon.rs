//! Mastodon adapter
//!
//! Works against any instance. Media attachments need a separate upload, so a
//! media URL is appended to the status text instead.
//!
//! Required: `tokens.access_token`, `account.instance_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "mastodon";

pub struct MastodonAdapter {
    client: Client,
}

impl MastodonAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct StatusRequest {
    status: String,
    visibility: &'static str,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
}

/// Accepts `mastodon.social` as well as `https://mastodon.social/`
fn instance_base(instance: &str) -> String {
    let trimmed = instance.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn status_text(post: &NormalizedPost) -> String {
    let mut parts = vec![post.text_with_hashtags()];
    parts.extend(post.link_url.iter().cloned());
    parts.extend(post.media_url.iter().cloned());
    parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Adapter for MastodonAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: false,
            analytics: false,
            note: "Media URL is appended to the status text",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let instance = post.require_account("instance_url")?;
        let status = status_text(post);
        if status.is_empty() {
            return Err(AdapterError::MissingField("text".to_string()));
        }

        let request = self
            .client
            .post(http::join(&instance_base(instance), "api/v1/statuses"))
            .bearer_auth(token)
            .json(&StatusRequest {
                status,
                visibility: "public",
            });

        let response: StatusResponse = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(response.id))
    }
}
