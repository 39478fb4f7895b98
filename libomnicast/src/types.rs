//! Core types for Omnicast

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, ErrorBody};

/// Platform-neutral description of one post
///
/// Built per call and consumed by a single adapter. `tokens` and `account`
/// are opaque to everything except the adapter that reads them; token values
/// are kept as [`SecretString`] so they never show up in `Debug` output.
#[derive(Debug, Default)]
pub struct NormalizedPost {
    pub text: String,
    pub media_url: Option<String>,
    pub link_url: Option<String>,
    pub alt: Option<String>,
    pub hashtags: Vec<String>,
    pub tokens: HashMap<String, SecretString>,
    pub account: HashMap<String, String>,
}

impl NormalizedPost {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link_url = Some(url.into());
        self
    }

    pub fn with_token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens
            .insert(key.into(), SecretString::from(value.into()));
        self
    }

    pub fn with_account(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.account.insert(key.into(), value.into());
        self
    }

    /// Look up a required credential; empty values count as missing
    pub fn require_token(&self, key: &str) -> Result<&str, AdapterError> {
        self.tokens
            .get(key)
            .map(|secret| secret.expose_secret())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AdapterError::MissingCredential(key.to_string()))
    }

    /// Look up a required account identifier; empty values count as missing
    pub fn require_account(&self, key: &str) -> Result<&str, AdapterError> {
        self.account
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AdapterError::MissingCredential(key.to_string()))
    }

    pub fn require_media(&self) -> Result<&str, AdapterError> {
        self.media_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AdapterError::MissingField("media_url".to_string()))
    }

    /// Text with hashtags appended, for platforms without a native tag field
    pub fn text_with_hashtags(&self) -> String {
        if self.hashtags.is_empty() {
            return self.text.clone();
        }
        let tags: Vec<String> = self
            .hashtags
            .iter()
            .map(|tag| {
                if tag.starts_with('#') {
                    tag.clone()
                } else {
                    format!("#{}", tag)
                }
            })
            .collect();
        if self.text.is_empty() {
            tags.join(" ")
        } else {
            format!("{}\n\n{}", self.text, tags.join(" "))
        }
    }
}

/// Static description of what one platform integration supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub post: bool,
    pub media: bool,
    pub analytics: bool,
    pub note: &'static str,
}

/// Entry of the capability table returned by `list_adapters`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterInfo {
    pub platform: String,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

/// Minimal normalized result of a successful publish
///
/// Serializes as `{"id": "..."}` or `{"status": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishReceipt {
    Id(String),
    Status(String),
}

impl std::fmt::Display for PublishReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishReceipt::Id(id) => write!(f, "id={}", id),
            PublishReceipt::Status(status) => write!(f, "status={}", status),
        }
    }
}

/// Outcome of publishing to one platform within a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformResult {
    pub platform: String,
    pub success: bool,
    pub receipt: Option<PublishReceipt>,
    pub error: Option<ErrorBody>,
}

impl PlatformResult {
    pub fn ok(platform: &str, receipt: PublishReceipt) -> Self {
        Self {
            platform: platform.to_string(),
            success: true,
            receipt: Some(receipt),
            error: None,
        }
    }

    pub fn failed(platform: &str, error: ErrorBody) -> Self {
        Self {
            platform: platform.to_string(),
            success: false,
            receipt: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_token_missing() {
        let post = NormalizedPost::new("hi");
        assert_eq!(
            post.require_token("bot_token"),
            Err(AdapterError::MissingCredential("bot_token".to_string()))
        );
    }

    #[test]
    fn test_require_token_empty_counts_as_missing() {
        let post = NormalizedPost::new("hi").with_token("bot_token", "   ");
        assert!(post.require_token("bot_token").is_err());
    }

    #[test]
    fn test_require_account_present() {
        let post = NormalizedPost::new("hi").with_account("chat_id", "42");
        assert_eq!(post.require_account("chat_id"), Ok("42"));
    }

    #[test]
    fn test_require_media() {
        let post = NormalizedPost::new("hi");
        assert_eq!(
            post.require_media(),
            Err(AdapterError::MissingField("media_url".to_string()))
        );

        let post = post.with_media("https://cdn.example.com/a.png");
        assert_eq!(post.require_media(), Ok("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let post = NormalizedPost::new("hi").with_token("access_token", "super-secret-value");
        let debug = format!("{:?}", post);
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_text_with_hashtags() {
        let mut post = NormalizedPost::new("Launch day");
        assert_eq!(post.text_with_hashtags(), "Launch day");

        post.hashtags = vec!["rust".to_string(), "#oss".to_string()];
        assert_eq!(post.text_with_hashtags(), "Launch day\n\n#rust #oss");
    }

    #[test]
    fn test_receipt_serialization() {
        let id = serde_json::to_value(PublishReceipt::Id("123".to_string())).unwrap();
        assert_eq!(id, serde_json::json!({ "id": "123" }));

        let status = serde_json::to_value(PublishReceipt::Status("ok".to_string())).unwrap();
        assert_eq!(status, serde_json::json!({ "status": "ok" }));
    }

    #[test]
    fn test_adapter_info_flattens_capabilities() {
        let info = AdapterInfo {
            platform: "telegram".to_string(),
            capabilities: Capabilities {
                post: true,
                media: true,
                analytics: false,
                note: "Bot API",
            },
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["platform"], "telegram");
        assert_eq!(json["post"], true);
        assert_eq!(json["analytics"], false);
        assert_eq!(json["note"], "Bot API");
    }
}
