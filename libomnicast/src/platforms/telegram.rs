//! Telegram Bot API adapter
//!
//! Text posts go through `sendMessage`; posts with media go through
//! `sendPhoto` with the text as caption. The bot must already be a member
//! (or admin, for channels) of the target chat.
//!
//! Required: `tokens.bot_token`, `account.chat_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "telegram";
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

pub struct TelegramAdapter {
    client: Client,
    base_url: String,
}

impl TelegramAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

#[derive(Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    #[serde(skip_serializing_if = "String::is_empty")]
    caption: String,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    result: Option<TelegramMessage>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    message_id: i64,
}

#[async_trait]
impl Adapter for TelegramAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: "Bot API; chat_id may be a numeric id or @channel username",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("bot_token")?;
        let chat_id = post.require_account("chat_id")?;
        let text = post.text_with_hashtags();
        let bot = format!("bot{}", token);

        let request = match post.media_url.as_deref() {
            Some(photo) => {
                let url = http::endpoint(PLATFORM, &self.base_url, &[bot.as_str(), "sendPhoto"])?;
                self.client.post(url).json(&SendPhoto {
                    chat_id,
                    photo,
                    caption: text,
                })
            }
            None => {
                if text.trim().is_empty() {
                    return Err(AdapterError::MissingField("text".to_string()));
                }
                let url =
                    http::endpoint(PLATFORM, &self.base_url, &[bot.as_str(), "sendMessage"])?;
                self.client
                    .post(url)
                    .json(&SendMessage { chat_id, text })
            }
        };

        let response: TelegramResponse = http::send_json(PLATFORM, request).await?;
        match (response.ok, response.result) {
            (true, Some(message)) => Ok(PublishReceipt::Id(message.message_id.to_string())),
            _ => Err(AdapterError::upstream(
                PLATFORM,
                None,
                response
                    .description
                    .unwrap_or_else(|| "Telegram returned ok=false".to_string()),
            )),
        }
    }
}
