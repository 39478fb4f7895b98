//! LinkedIn adapter (UGC Posts API)
//!
//! Required: `tokens.access_token`, `account.author_urn`
//! (`urn:li:person:...` or `urn:li:organization:...`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "linkedin";
const DEFAULT_BASE_URL: &str = "https://api.linkedin.com";
const RESTLI_HEADER: &str = "X-Restli-Protocol-Version";

pub struct LinkedInAdapter {
    client: Client,
    base_url: String,
}

impl LinkedInAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize, Default)]
struct UgcPostResponse {
    id: Option<String>,
}

fn share_body(author: &str, post: &NormalizedPost) -> serde_json::Value {
    let commentary = post.text_with_hashtags();
    let share_content = match post.link_url.as_deref() {
        Some(link) => json!({
            "shareCommentary": { "text": commentary },
            "shareMediaCategory": "ARTICLE",
            "media": [{ "status": "READY", "originalUrl": link }],
        }),
        None => json!({
            "shareCommentary": { "text": commentary },
            "shareMediaCategory": "NONE",
        }),
    };

    json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": { "com.linkedin.ugc.ShareContent": share_content },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
    })
}

#[async_trait]
impl Adapter for LinkedInAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: false,
            analytics: true,
            note: "Text and article links; image upload needs the assets API",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let author = post.require_account("author_urn")?;

        let request = self
            .client
            .post(http::join(&self.base_url, "v2/ugcPosts"))
            .bearer_auth(token)
            .header(RESTLI_HEADER, "2.0.0")
            .json(&share_body(author, post));

        let response = http::send(PLATFORM, request).await?;
        let restli_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(id) = restli_id {
            return Ok(PublishReceipt::Id(id));
        }

        // 201 responses often have an empty body
        let body: UgcPostResponse = response.json().await.unwrap_or_default();
        Ok(match body.id {
            Some(id) => PublishReceipt::Id(id),
            None => PublishReceipt::Status("created".to_string()),
        })
    }
}
