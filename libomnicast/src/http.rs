//! Shared HTTP plumbing for platform adapters
//!
//! One `reqwest::Client` is built at startup and handed to every adapter.
//! Its timeout bounds each outbound call.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::error::{AdapterError, ConfigError, Result};

/// Longest upstream body excerpt kept in an error message
const MAX_ERROR_BODY: usize = 300;

pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()).into())
}

/// Send a request and reject non-2xx responses
pub(crate) async fn send(
    platform: &str,
    request: RequestBuilder,
) -> std::result::Result<Response, AdapterError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(platform, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AdapterError::upstream(
        platform,
        Some(status.as_u16()),
        format!("HTTP {}: {}", status.as_u16(), excerpt(&body)),
    ))
}

/// Send a request and decode a JSON success body
pub(crate) async fn send_json<T: DeserializeOwned>(
    platform: &str,
    request: RequestBuilder,
) -> std::result::Result<T, AdapterError> {
    let response = send(platform, request).await?;
    response.json::<T>().await.map_err(|e| {
        AdapterError::upstream(
            platform,
            None,
            format!("Unexpected response: {}", e.without_url()),
        )
    })
}

fn transport_error(platform: &str, error: reqwest::Error) -> AdapterError {
    // URLs are stripped because some endpoints embed the token in the path.
    let error = error.without_url();
    if error.is_timeout() {
        AdapterError::upstream(platform, Some(504), format!("Request timed out: {}", error))
    } else {
        AdapterError::upstream(platform, None, format!("Network error: {}", error))
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
    format!("{}...", cut)
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Append path segments to a base URL, percent-encoding each segment
///
/// A `/`, `?` or `#` inside a segment stays part of that segment.
pub(crate) fn endpoint(
    platform: &str,
    base: &str,
    segments: &[&str],
) -> std::result::Result<Url, AdapterError> {
    let invalid = || AdapterError::upstream(platform, None, format!("Invalid base URL: {}", base));
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
