//! Tumblr adapter (API v2, Neue Post Format)
//!
//! Required: `tokens.access_token` (OAuth 2.0), `account.blog_identifier`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "tumblr";
const DEFAULT_BASE_URL: &str = "https://api.tumblr.com";

pub struct TumblrAdapter {
    client: Client,
    base_url: String,
}

impl TumblrAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct TumblrEnvelope {
    response: TumblrPost,
}

#[derive(Deserialize)]
struct TumblrPost {
    id_string: Option<String>,
    id: Option<serde_json::Value>,
}

fn npf_body(post: &NormalizedPost) -> serde_json::Value {
    let mut content = Vec::new();
    if !post.text.trim().is_empty() {
        content.push(json!({ "type": "text", "text": post.text }));
    }
    if let Some(url) = post.media_url.as_deref() {
        let mut image = json!({ "type": "image", "media": [{ "url": url }] });
        if let Some(alt) = post.alt.as_deref() {
            image["alt_text"] = json!(alt);
        }
        content.push(image);
    }
    if let Some(link) = post.link_url.as_deref() {
        content.push(json!({ "type": "link", "url": link }));
    }

    // Tumblr has native tags, so hashtags are not appended to the text
    let tags: Vec<&str> = post
        .hashtags
        .iter()
        .map(|tag| tag.trim_start_matches('#'))
        .collect();

    json!({ "content": content, "tags": tags.join(",") })
}

#[async_trait]
impl Adapter for TumblrAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "NPF posts with text, image and link blocks",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let blog = post.require_account("blog_identifier")?;

        let request = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &["v2", "blog", blog, "posts"])?)
            .bearer_auth(token)
            .json(&npf_body(post));

        let envelope: TumblrEnvelope = http::send_json(PLATFORM, request).await?;
        let id = envelope.response.id_string.or_else(|| {
            envelope.response.id.map(|value| match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
        });

        Ok(match id {
            Some(id) => PublishReceipt::Id(id),
            None => PublishReceipt::Status("created".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_npf_blocks_and_tags() {
        let mut post = NormalizedPost::new("caption").with_media("https://cdn.example.com/t.gif");
        post.hashtags = vec!["#art".to_string(), "gif".to_string()];

        let body = npf_body(&post);
        assert_eq!(body["content"][0]["type"], "text");
        assert_eq!(body["content"][1]["type"], "image");
        assert_eq!(body["tags"], "art,gif");
    }

    #[tokio::test]
    async fn test_numeric_id_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/blog/staff.tumblr.com/posts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "meta": { "status": 201, "msg": "Created" },
                "response": { "id": 7001 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TumblrAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("hi")
            .with_token("access_token", "t")
            .with_account("blog_identifier", "staff.tumblr.com");

        assert_eq!(
            adapter.publish(&post).await.unwrap(),
            PublishReceipt::Id("7001".to_string())
        );
    }

    #[tokio::test]
    async fn test_blog_identifier_cannot_escape_blog_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/blog/staff%2F..%2Fuser/posts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "response": { "id_string": "8002" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TumblrAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("hi")
            .with_token("access_token", "t")
            .with_account("blog_identifier", "staff/../user");

        assert_eq!(
            adapter.publish(&post).await.unwrap(),
            PublishReceipt::Id("8002".to_string())
        );
    }
}
