//! Bluesky adapter (AT Protocol XRPC)
//!
//! Each publish opens a session with an app password, then writes an
//! `app.bsky.feed.post` record to the account's repo. Images would need a
//! blob upload, which this integration does not do.
//!
//! Required: `tokens.app_password`, `account.handle`.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::http;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

const PLATFORM: &str = "bluesky";
const DEFAULT_BASE_URL: &str = "https://bsky.social";
const POST_COLLECTION: &str = "app.bsky.feed.post";

pub struct BlueskyAdapter {
    client: Client,
    base_url: String,
}

impl BlueskyAdapter {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct CreateSession<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Serialize)]
struct CreateRecord<'a> {
    repo: &'a str,
    collection: &'static str,
    record: FeedPost,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedPost {
    #[serde(rename = "$type")]
    kind: &'static str,
    text: String,
    created_at: String,
}

#[derive(Deserialize)]
struct RecordRef {
    uri: String,
}

fn post_text(post: &NormalizedPost) -> String {
    let text = post.text_with_hashtags();
    match post.link_url.as_deref() {
        Some(link) if !text.contains(link) => format!("{}\n{}", text, link).trim().to_string(),
        _ => text,
    }
}

#[async_trait]
impl Adapter for BlueskyAdapter {
    fn id(&self) -> &str {
        PLATFORM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: false,
            analytics: false,
            note: "Text posts via app password; images are not uploaded",
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        let password = post.require_token("app_password")?;
        let handle = post.require_account("handle")?;
        let text = post_text(post);
        if text.is_empty() {
            return Err(AdapterError::MissingField("text".to_string()));
        }

        let login = self
            .client
            .post(http::join(&self.base_url, "xrpc/com.atproto.server.createSession"))
            .json(&CreateSession {
                identifier: handle,
                password,
            });
        let session: Session = http::send_json(PLATFORM, login).await?;

        let record = CreateRecord {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: FeedPost {
                kind: POST_COLLECTION,
                text,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };
        let create = self
            .client
            .post(http::join(&self.base_url, "xrpc/com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&record);
        let created: RecordRef = http::send_json(PLATFORM, create).await?;

        Ok(PublishReceipt::Id(created.uri))
    }
}
