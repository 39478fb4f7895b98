//! WhatsApp Cloud API adapter
//!
//! Sends a text or image message from a business phone number to one
//! recipient.
//!
//! Required: `tokens.access_token`, `account.phone_number_id`, `account.to`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::facebook::GRAPH_BASE_URL;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "whatsapp";

pub struct WhatsAppAdapter {
    client: Client,
    base_url: String,
}

impl WhatsAppAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, GRAPH_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<MessageId>,
}

#[derive(Deserialize)]
struct MessageId {
    id: String,
}

fn message_body(to: &str, post: &NormalizedPost) -> serde_json::Value {
    let text = post.text_with_hashtags();
    match post.media_url.as_deref() {
        Some(link) => json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "image",
            "image": { "link": link, "caption": text },
        }),
        None => json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": text, "preview_url": true },
        }),
    }
}

#[async_trait]
impl Adapter for WhatsAppAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Cloud API message to a single recipient, not a broadcast",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("access_token")?;
        let phone_number_id = post.require_account("phone_number_id")?;
        let to = post.require_account("to")?;

        let request = self
            .client
            .post(http::endpoint(PLATFORM, &self.base_url, &[phone_number_id, "messages"])?)
            .bearer_auth(token)
            .json(&message_body(to, post));

        let response: MessagesResponse = http::send_json(PLATFORM, request).await?;
        match response.messages.into_iter().next() {
            Some(message) => Ok(PublishReceipt::Id(message.id)),
            None => Ok(PublishReceipt::Status("accepted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1001/messages"))
            .and(header("Authorization", "Bearer wa-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{ "id": "wamid.ABC" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = WhatsAppAdapter::with_base_url(Client::new(), server.uri());
        let post = NormalizedPost::new("hi")
            .with_token("access_token", "wa-token")
            .with_account("phone_number_id", "1001")
            .with_account("to", "15550001111");

        assert_eq!(
            adapter.publish(&post).await.unwrap(),
            PublishReceipt::Id("wamid.ABC".to_string())
        );
    }

    #[test]
    fn test_image_body() {
        let post = NormalizedPost::new("look").with_media("https://cdn.example.com/a.png");
        let body = message_body("1555", &post);
        assert_eq!(body["type"], "image");
        assert_eq!(body["image"]["caption"], "look");
    }

    #[tokio::test]
    async fn test_missing_recipient() {
        let post = NormalizedPost::new("hi")
            .with_token("access_token", "t")
            .with_account("phone_number_id", "1001");
        let err = WhatsAppAdapter::new(Client::new())
            .publish(&post)
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::MissingCredential("to".to_string()));
    }
}
