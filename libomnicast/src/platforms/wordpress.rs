//! WordPress adapter (REST API with application passwords)
//!
//! Required: `tokens.application_password`, `account.site_url`,
//! `account.username`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "wordpress";
const TITLE_CHARS: usize = 80;

pub struct WordPressAdapter {
    client: Client,
}

impl WordPressAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct CreatePost {
    title: String,
    content: String,
    status: &'static str,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: u64,
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn build_post(post: &NormalizedPost) -> CreatePost {
    let title: String = post
        .text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .chars()
        .take(TITLE_CHARS)
        .collect();

    let mut content = post.text_with_hashtags();
    if let Some(url) = post.media_url.as_deref() {
        let alt = post.alt.as_deref().unwrap_or_default();
        content.push_str(&format!(
            "\n\n<img src=\"{}\" alt=\"{}\" />",
            escape_attr(url),
            escape_attr(alt)
        ));
    }
    if let Some(link) = post.link_url.as_deref() {
        content.push_str(&format!(
            "\n\n<a href=\"{}\">{}</a>",
            escape_attr(link),
            escape_attr(link)
        ));
    }

    CreatePost {
        title,
        content,
        status: "publish",
    }
}

#[async_trait]
impl Adapter for WordPressAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Media is embedded by URL, not uploaded to the media library",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let password = post.require_token("application_password")?;
        let site = post.require_account("site_url")?;
        let username = post.require_account("username")?;

        let request = self
            .client
            .post(http::join(site, "wp-json/wp/v2/posts"))
            .basic_auth(username, Some(password))
            .json(&build_post(post));

        let created: CreatedPost = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(created.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_media_is_escaped() {
        let post = NormalizedPost::new("Title line\nbody")
            .with_media("https://cdn.example.com/a.jpg?x=1&y=\"2\"");
        let built = build_post(&post);

        assert_eq!(built.title, "Title line");
        assert!(built
            .content
            .contains("src=\"https://cdn.example.com/a.jpg?x=1&amp;y=&quot;2&quot;\""));
    }

    #[tokio::test]
    async fn test_publish_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 314,
                "status": "publish"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let post = NormalizedPost::new("Hello blog")
            .with_token("application_password", "abcd efgh")
            .with_account("site_url", server.uri())
            .with_account("username", "editor");

        assert_eq!(
            WordPressAdapter::new(Client::new()).publish(&post).await.unwrap(),
            PublishReceipt::Id("314".to_string())
        );
    }
}
