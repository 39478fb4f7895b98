//! Reddit adapter
//!
//! Submits a link post when a media or link URL is present, otherwise a self
//! post. The title is the first line of the text.
//!
//! Required: `tokens.access_token` (OAuth bearer), `account.subreddit`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "reddit";
const DEFAULT_BASE_URL: &str = "https://oauth.reddit.com";
const MAX_TITLE_CHARS: usize = 300;

pub struct RedditAdapter {
    client: Client,
    base_url: String,
}

impl RedditAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    json: SubmitJson,
}

#[derive(Deserialize)]
struct SubmitJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    data: Option<SubmitData>,
}

#[derive(Deserialize)]
struct SubmitData {
    name: Option<String>,
}

fn title(text: &str) -> Option<String> {
    let first = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    Some(first.chars().take(MAX_TITLE_CHARS).collect())
}

#[async_trait]
impl Adapter for RedditAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Media is submitted as a link post; subreddit rules still apply",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let subreddit = post.require_account("subreddit")?;
        let title =
            title(&post.text).ok_or_else(|| AdapterError::MissingField("text".to_string()))?;
        let body = post.text_with_hashtags();

        let mut form = vec![
            ("api_type", "json"),
            ("sr", subreddit.trim_start_matches("r/")),
            ("title", title.as_str()),
        ];
        match post.media_url.as_deref().or(post.link_url.as_deref()) {
            Some(url) => {
                form.push(("kind", "link"));
                form.push(("url", url));
            }
            None => {
                form.push(("kind", "self"));
                form.push(("text", body.as_str()));
            }
        }

        let request = self
            .client
            .post(http::join(&self.base_url, "api/submit"))
            .bearer_auth(token)
            .form(&form);

        let response: SubmitResponse = http::send_json(PLATFORM, request).await?;
        if !response.json.errors.is_empty() {
            return Err(AdapterError::upstream(
                PLATFORM,
                None,
                serde_json::Value::Array(response.json.errors).to_string(),
            ));
        }

        Ok(match response.json.data.and_then(|d| d.name) {
            Some(name) => PublishReceipt::Id(name),
            None => PublishReceipt::Status("submitted".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post(text: &str) -> NormalizedPost {
        NormalizedPost::new(text)
            .with_token("access_token", "t")
            .with_account("subreddit", "r/rust")
    }

    #[test]
    fn test_title_is_first_non_empty_line() {
        assert_eq!(title("\n  Release day \nbody").as_deref(), Some("Release day"));
        assert_eq!(title("x".repeat(400).as_str()).unwrap().len(), MAX_TITLE_CHARS);
        assert!(title("   \n ").is_none());
    }

    #[tokio::test]
    async fn test_self_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/submit"))
            .and(body_string_contains("kind=self"))
            .and(body_string_contains("sr=rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": { "errors": [], "data": { "name": "t3_abc" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = RedditAdapter::with_base_url(Client::new(), server.uri());
        assert_eq!(
            adapter.publish(&post("Release day\nnotes")).await.unwrap(),
            PublishReceipt::Id("t3_abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_api_errors_are_upstream_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": { "errors": [["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]] }
            })))
            .mount(&server)
            .await;

        let adapter = RedditAdapter::with_base_url(Client::new(), server.uri());
        let err = adapter.publish(&post("hi")).await.unwrap_err();
        assert_eq!(err.code(), "upstream_failure");
        assert!(err.to_string().contains("SUBREDDIT_NOEXIST"));
    }

    #[tokio::test]
    async fn test_empty_text_has_no_title() {
        let err = RedditAdapter::new(Client::new())
            .publish(&post("  "))
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::MissingField("text".to_string()));
    }
}
