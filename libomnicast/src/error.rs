//! Error types for Omnicast
//!
//! Every error carries a stable snake_case `code()` and a numeric
//! `status_hint()`. Both are part of the external contract: clients match on
//! them, so existing values must never change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OmnicastError>;

#[derive(Error, Debug)]
pub enum OmnicastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Adapter(#[from] AdapterError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index {index} is out of range ({len} item(s))")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OmnicastError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            OmnicastError::Config(_) => "config_error",
            OmnicastError::Adapter(e) => e.code(),
            OmnicastError::Validation(_) => "validation_error",
            OmnicastError::NotFound(_) => "not_found",
            OmnicastError::IndexOutOfRange { .. } => "index_out_of_range",
            OmnicastError::UnsupportedPlatform(_) => "unsupported_platform",
            OmnicastError::Serialization(_) => "serialization_error",
        }
    }

    /// Suggested HTTP-style status for callers that surface this error
    pub fn status_hint(&self) -> u16 {
        match self {
            OmnicastError::Config(_) => 500,
            OmnicastError::Adapter(e) => e.status_hint(),
            OmnicastError::Validation(_) => 400,
            OmnicastError::NotFound(_) => 404,
            OmnicastError::IndexOutOfRange { .. } => 400,
            OmnicastError::UnsupportedPlatform(_) => 404,
            OmnicastError::Serialization(_) => 500,
        }
    }

    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OmnicastError::Validation(_)
            | OmnicastError::NotFound(_)
            | OmnicastError::IndexOutOfRange { .. }
            | OmnicastError::UnsupportedPlatform(_) => 3,
            OmnicastError::Adapter(AdapterError::MissingCredential(_))
            | OmnicastError::Adapter(AdapterError::MissingField(_)) => 2,
            OmnicastError::Adapter(_) => 1,
            OmnicastError::Config(_) | OmnicastError::Serialization(_) => 1,
        }
    }

    /// Serializable form of this error
    pub fn to_body(&self) -> ErrorBody {
        if let OmnicastError::Adapter(e) = self {
            return e.to_body();
        }
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            status: self.status_hint(),
            reason: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures raised by a single platform adapter
///
/// Cloneable so that per-platform outcomes can be kept on job records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("{platform} is not supported by this integration ({reason})")]
    NotSupported { platform: String, reason: String },

    #[error("{platform} request failed: {message}")]
    Upstream {
        platform: String,
        status: Option<u16>,
        message: String,
    },
}

impl AdapterError {
    pub fn not_supported(platform: &str, reason: &str) -> Self {
        AdapterError::NotSupported {
            platform: platform.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn upstream(platform: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        AdapterError::Upstream {
            platform: platform.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::MissingCredential(_) => "missing_credential",
            AdapterError::MissingField(_) => "missing_field",
            AdapterError::NotSupported { .. } => "not_supported",
            AdapterError::Upstream { .. } => "upstream_failure",
        }
    }

    /// Upstream failures pass the remote status through; 502 when there was none
    pub fn status_hint(&self) -> u16 {
        match self {
            AdapterError::MissingCredential(_) | AdapterError::MissingField(_) => 400,
            AdapterError::NotSupported { .. } => 501,
            AdapterError::Upstream { status, .. } => status.unwrap_or(502),
        }
    }

    /// Machine-readable reason, set for `NotSupported`
    pub fn reason(&self) -> Option<&str> {
        match self {
            AdapterError::NotSupported { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            status: self.status_hint(),
            reason: self.reason().map(str::to_string),
        }
    }
}

/// Wire representation of an error: `{code, message, status, reason?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub status: u16,
    /// Snake_case detail for `not_supported` (e.g. `partner_only`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
