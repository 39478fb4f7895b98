//! X (Twitter) API v2 adapter
//!
//! Media on X needs the chunked v1.1 upload flow, which this integration does
//! not implement; a media URL is ignored and a link URL is appended to the
//! text instead.
//!
//! Required: `tokens.access_token` (OAuth 2.0 user context).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "x";
const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

pub struct XAdapter {
    client: Client,
    base_url: String,
}

impl XAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

fn tweet_text(post: &NormalizedPost) -> String {
    let text = post.text_with_hashtags();
    match post.link_url.as_deref() {
        Some(link) if !text.contains(link) => format!("{} {}", text, link).trim().to_string(),
        _ => text,
    }
}

#[async_trait]
impl Adapter for XAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: false,
            analytics: true,
            note: "Text and links only; media upload is not implemented",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let text = tweet_text(post);
        if text.is_empty() {
            return Err(AdapterError::MissingField("text".to_string()));
        }

        let request = self
            .client
            .post(http::join(&self.base_url, "2/tweets"))
            .bearer_auth(token)
            .json(&CreateTweetRequest { text });

        let response: CreateTweetResponse = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(response.data.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_publish_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({ "text": "hi https://example.com" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "1790000000000000000" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = XAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("hi")
            .with_link("https://example.com")
            .with_token("access_token", "test-token");

        let receipt = adapter.publish(&post).await.unwrap();
        assert_eq!(receipt, PublishReceipt::Id("1790000000000000000".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limited_passes_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = XAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("hi").with_token("access_token", "t");

        let err = adapter.publish(&post).await.unwrap_err();
        assert_eq!(err.status_hint(), 429);
    }

    #[test]
    fn test_link_not_duplicated() {
        let post = NormalizedPost::new("read https://example.com").with_link("https://example.com");
        assert_eq!(tweet_text(&post), "read https://example.com");
    }
}
