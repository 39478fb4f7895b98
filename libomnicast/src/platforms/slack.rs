//! Slack adapter (`chat.postMessage`)
//!
//! Slack answers 200 even for failures and reports them as `ok: false`, so
//! the body is checked in addition to the status.
//!
//! Required: `tokens.bot_token`, `account.channel`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "slack";
const DEFAULT_BASE_URL: &str = "https://slack.com";

pub struct SlackAdapter {
    client: Client,
    base_url: String,
}

impl SlackAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

fn message_body(channel: &str, post: &NormalizedPost) -> serde_json::Value {
    let text = post.text_with_hashtags();
    match post.media_url.as_deref() {
        Some(image_url) => json!({
            "channel": channel,
            "text": text,
            "blocks": [
                { "type": "section", "text": { "type": "mrkdwn", "text": text } },
                {
                    "type": "image",
                    "image_url": image_url,
                    "alt_text": post.alt.as_deref().unwrap_or("image"),
                }
            ]
        }),
        None => json!({ "channel": channel, "text": text }),
    }
}

#[async_trait]
impl Adapter for SlackAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Bot token with chat:write; media rendered as an image block",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("bot_token")?;
        let channel = post.require_account("channel")?;

        let request = self
            .client
            .post(http::join(&self.base_url, "api/chat.postMessage"))
            .bearer_auth(token)
            .json(&message_body(channel, post));

        let response: PostMessageResponse = http::send_json(PLATFORM, request).await?;
        match (response.ok, response.ts) {
            (true, Some(ts)) => Ok(PublishReceipt::Id(ts)),
            (true, None) => Ok(PublishReceipt::Status("ok".to_string())),
            (false, _) => Err(AdapterError::upstream(
                PLATFORM,
                None,
                response.error.unwrap_or_else(|| "unknown_error".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post() -> NormalizedPost {
        NormalizedPost::new("deploy finished")
            .with_token("bot_token", "xoxb-1")
            .with_account("channel", "C123")
    }

    #[tokio::test]
    async fn test_publish_returns_ts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("Authorization", "Bearer xoxb-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "ts": "1700000000.000100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = SlackAdapter::with_base_url(Client::new(), server.uri());
        let receipt = adapter.publish(&post()).await.unwrap();

        assert_eq!(receipt, PublishReceipt::Id("1700000000.000100".to_string()));
    }

    #[tokio::test]
    async fn test_ok_false_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let adapter = SlackAdapter::with_base_url(Client::new(), server.uri());
        let err = adapter.publish(&post()).await.unwrap_err();

        assert_eq!(err.code(), "upstream_failure");
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[test]
    fn test_media_adds_image_block() {
        let body = message_body("C1", &post().with_media("https://cdn.example.com/a.png"));
        assert_eq!(body["blocks"][1]["type"], "image");
        assert_eq!(body["blocks"][1]["image_url"], "https://cdn.example.com/a.png");
    }
}
