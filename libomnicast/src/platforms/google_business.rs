//! Google Business Profile adapter (local posts)
//!
//! Required: `tokens.access_token`, `account.account_id`,
//! `account.location_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "google_business";
const DEFAULT_BASE_URL: &str = "https://mybusiness.googleapis.com";

pub struct GoogleBusinessAdapter {
    client: Client,
    base_url: String,
}

impl GoogleBusinessAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct LocalPost {
    name: Option<String>,
}

fn local_post_body(post: &NormalizedPost) -> serde_json::Value {
    let mut body = json!({
        "languageCode": "en",
        "summary": post.text_with_hashtags(),
        "topicType": "STANDARD",
    });
    if let Some(url) = post.media_url.as_deref() {
        body["media"] = json!([{ "mediaFormat": "PHOTO", "sourceUrl": url }]);
    }
    if let Some(link) = post.link_url.as_deref() {
        body["callToAction"] = json!({ "actionType": "LEARN_MORE", "url": link });
    }
    body
}

#[async_trait]
impl Adapter for GoogleBusinessAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: true,
            note: "Standard local posts for one verified location",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let account_id = post.require_account("account_id")?;
        let location_id = post.require_account("location_id")?;

        let url = http::endpoint(
            PLATFORM,
            &self.base_url,
            &["v4", "accounts", account_id, "locations", location_id, "localPosts"],
        )?;
        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&local_post_body(post));

        let created: LocalPost = http::send_json(PLATFORM, request).await?;
        Ok(match created.name {
            Some(name) => PublishReceipt::Id(name),
            None => PublishReceipt::Status("created".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_local_post_with_photo_and_cta() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/accounts/a1/locations/l1/localPosts"))
            .and(body_partial_json(serde_json::json!({
                "topicType": "STANDARD",
                "callToAction": { "actionType": "LEARN_MORE", "url": "https://shop.example.com" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "accounts/a1/locations/l1/localPosts/p9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = GoogleBusinessAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("Weekend sale")
            .with_media("https://cdn.example.com/sale.jpg")
            .with_link("https://shop.example.com")
            .with_token("access_token", "t")
            .with_account("account_id", "a1")
            .with_account("location_id", "l1");

        assert_eq!(
            adapter.publish(&post).await.unwrap(),
            PublishReceipt::Id("accounts/a1/locations/l1/localPosts/p9".to_string())
        );
    }

    #[test]
    fn test_text_only_body_has_no_media() {
        let body = local_post_body(&NormalizedPost::new("hours changed"));
        assert!(body.get("media").is_none());
        assert_eq!(body["summary"], "hours changed");
    }
}
