//! Pinterest adapter (API v5)
//!
//! Pins are image-first, so a media URL is required.
//!
//! Required: `tokens.access_token`, `account.board_id`, `media_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "pinterest";
const DEFAULT_BASE_URL: &str = "https://api.pinterest.com";

pub struct PinterestAdapter {
    client: Client,
    base_url: String,
}

impl PinterestAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct CreatePin<'a> {
    board_id: &'a str,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alt_text: Option<&'a str>,
    media_source: MediaSource<'a>,
}

#[derive(Serialize)]
struct MediaSource<'a> {
    source_type: &'static str,
    url: &'a str,
}

#[derive(Deserialize)]
struct PinResponse {
    id: String,
}

#[async_trait]
impl Adapter for PinterestAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: true,
            note: "Every pin needs an image URL and a board",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let board_id = post.require_account("board_id")?;
        let image_url = post.require_media()?;

        let pin = CreatePin {
            board_id,
            description: post.text_with_hashtags(),
            link: post.link_url.as_deref(),
            alt_text: post.alt.as_deref(),
            media_source: MediaSource {
                source_type: "image_url",
                url: image_url,
            },
        };

        let request = self
            .client
            .post(http::join(&self.base_url, "v5/pins"))
            .bearer_auth(token)
            .json(&pin);

        let response: PinResponse = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(response.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_pin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v5/pins"))
            .and(body_partial_json(serde_json::json!({
                "board_id": "b-1",
                "media_source": { "source_type": "image_url", "url": "https://cdn.example.com/p.jpg" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "pin-5" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let adapter = PinterestAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("recipe")
            .with_media("https://cdn.example.com/p.jpg")
            .with_token("access_token", "t")
            .with_account("board_id", "b-1");

        assert_eq!(
            adapter.publish(&post).await.unwrap(),
            PublishReceipt::Id("pin-5".to_string())
        );
    }

    #[tokio::test]
    async fn test_media_checked_after_credentials() {
        let adapter = PinterestAdapter::new(Client::new());
        let post = NormalizedPost::new("no image")
            .with_token("access_token", "t")
            .with_account("board_id", "b-1");

        let err = adapter.publish(&post).await.unwrap_err();
        assert_eq!(err.code(), "missing_field");
    }
}
