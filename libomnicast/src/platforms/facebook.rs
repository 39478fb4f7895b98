//! Facebook Page adapter (Graph API)
//!
//! Text and link posts go to `/{page_id}/feed`; posts with media go to
//! `/{page_id}/photos`, which fetches the image from its public URL. The page
//! token travels as the `access_token` query parameter.
//!
//! Required: `tokens.page_access_token`, `account.page_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "facebook";
pub(crate) const GRAPH_BASE_URL: &str = "https://graph.facebook.com/v19.0";

pub struct FacebookAdapter {
    client: Client,
    base_url: String,
}

impl FacebookAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, GRAPH_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct GraphPostResponse {
    id: String,
    post_id: Option<String>,
}

#[async_trait]
impl Adapter for FacebookAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: true,
            note: "Page posts only; media must be a publicly reachable image URL",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let token = post.require_token("page_access_token")?;
        let page_id = post.require_account("page_id")?;
        let message = post.text_with_hashtags();

        let request = match post.media_url.as_deref() {
            Some(url) => {
                let form = [("url", url), ("caption", message.as_str())];
                self.client
                    .post(http::endpoint(PLATFORM, &self.base_url, &[page_id, "photos"])?)
                    .query(&[("access_token", token)])
                    .form(&form)
            }
            None => {
                let mut form = vec![("message", message.as_str())];
                if let Some(link) = post.link_url.as_deref() {
                    form.push(("link", link));
                }
                self.client
                    .post(http::endpoint(PLATFORM, &self.base_url, &[page_id, "feed"])?)
                    .query(&[("access_token", token)])
                    .form(&form)
            }
        };

        let response: GraphPostResponse = http::send_json(PLATFORM, request).await?;
        Ok(PublishReceipt::Id(response.post_id.unwrap_or(response.id)))
    }
}
